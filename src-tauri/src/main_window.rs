use std::{path::PathBuf, thread, time::Duration};

use tauri::{
    image::Image, AppHandle, CloseRequestApi, LogicalPosition, LogicalSize, Manager, Runtime,
    WebviewUrl, WebviewWindow, WebviewWindowBuilder, Window,
};
use tauri_plugin_dialog::{DialogExt, MessageDialogButtons, MessageDialogResult};

use crate::{
    launch_config::{self, LaunchConfig},
    unsaved_state::UnsavedStateDescriptor,
    window_bounds::{self, WindowBounds},
    window_lifecycle::{CloseDecision, PromptChoice, PromptOutcome},
    AppContext, DEFAULT_WINDOW_HEIGHT, DEFAULT_WINDOW_TITLE, DEFAULT_WINDOW_WIDTH,
    DISCARD_CLOSE_DELAY_MS, MAIN_WINDOW_LABEL, SAVE_CHECK_SCRIPT,
};

fn window_state_path<R: Runtime>(app_handle: &AppHandle<R>) -> Option<PathBuf> {
    match app_handle.path().app_config_dir() {
        Ok(config_dir) => Some(window_bounds::window_state_path(&config_dir)),
        Err(error) => {
            tracing::warn!(%error, "failed to resolve app config directory");
            None
        }
    }
}

/// Creates the main window hidden; it is revealed once the page has loaded.
pub(crate) fn create_main_window<R: Runtime>(
    app_handle: &AppHandle<R>,
    launch: &LaunchConfig,
) -> Result<(), String> {
    let context = app_handle.state::<AppContext>();
    let location = launch_config::build_start_location(launch, &context.app_config)
        .map_err(|error| format!("failed to build start URL: {error}"))?;
    tracing::info!(url = %location.url, "opening main window");

    let mut builder = WebviewWindowBuilder::new(
        app_handle,
        MAIN_WINDOW_LABEL,
        WebviewUrl::CustomProtocol(location.url),
    )
    .title(DEFAULT_WINDOW_TITLE)
    .inner_size(DEFAULT_WINDOW_WIDTH, DEFAULT_WINDOW_HEIGHT)
    .visible(false);

    if let Some(bounds) = window_state_path(app_handle)
        .as_deref()
        .and_then(window_bounds::read_window_bounds)
    {
        builder = builder
            .inner_size(bounds.width, bounds.height)
            .position(bounds.x, bounds.y);
    }

    if let Some(icon_path) = location.icon.map(|icon| context.resource_dir.join(icon)) {
        match Image::from_path(&icon_path) {
            Ok(icon) => builder = builder.icon(icon).map_err(|error| error.to_string())?,
            Err(error) => {
                tracing::debug!(
                    %error,
                    path = %icon_path.display(),
                    "perspective icon unavailable"
                );
            }
        }
    }

    builder
        .build()
        .map(|_| ())
        .map_err(|error| format!("failed to create main window: {error}"))
}

pub(crate) fn reveal_main_window<R: Runtime>(window: &WebviewWindow<R>) {
    let context = window.state::<AppContext>();
    if let Err(error) = context.lifecycle().first_paint() {
        tracing::warn!(%error, "ignoring page load");
        return;
    }
    if let Err(error) = window.show() {
        tracing::error!(%error, "failed to show main window");
    }
}

pub(crate) fn focus_main_window<R: Runtime>(app_handle: &AppHandle<R>) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        tracing::debug!("focus skipped: main window not found");
        return;
    };
    if let Err(error) = window.unminimize() {
        tracing::warn!(%error, "failed to unminimize main window");
    }
    if let Err(error) = window.set_focus() {
        tracing::warn!(%error, "failed to focus main window");
    }
}

/// Exam mode: fullscreen and pinned above other windows.
pub(crate) fn set_kiosk<R: Runtime>(app_handle: &AppHandle<R>, enabled: bool) {
    let Some(window) = app_handle.get_webview_window(MAIN_WINDOW_LABEL) else {
        tracing::warn!(enabled, "kiosk mode skipped: main window not found");
        return;
    };
    if let Err(error) = window.set_fullscreen(enabled) {
        tracing::error!(%error, enabled, "failed to toggle fullscreen");
    }
    if let Err(error) = window.set_always_on_top(enabled) {
        tracing::error!(%error, enabled, "failed to toggle always-on-top");
    }
}

fn current_bounds<R: Runtime>(window: &Window<R>) -> tauri::Result<WindowBounds> {
    let scale_factor = window.scale_factor()?;
    let position: LogicalPosition<f64> = window.outer_position()?.to_logical(scale_factor);
    let size: LogicalSize<f64> = window.inner_size()?.to_logical(scale_factor);
    Ok(WindowBounds {
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
    })
}

fn persist_bounds<R: Runtime>(window: &Window<R>) {
    let Some(state_path) = window_state_path(window.app_handle()) else {
        return;
    };
    let result = current_bounds(window)
        .map_err(|error| error.to_string())
        .and_then(|bounds| {
            window_bounds::write_window_bounds(&state_path, bounds)
                .map_err(|error| error.to_string())
        });
    if let Err(error) = result {
        tracing::warn!(%error, "failed to persist window bounds");
    }
}

pub(crate) fn handle_close_requested<R: Runtime>(window: &Window<R>, api: &CloseRequestApi) {
    let context = window.state::<AppContext>();
    let (decision, discarding) = {
        let mut lifecycle = context.lifecycle();
        (lifecycle.request_close(), lifecycle.discard_scheduled())
    };
    match decision {
        Ok(CloseDecision::Proceed) => {
            if discarding {
                tracing::info!("closing without saving changes");
            }
            persist_bounds(window);
        }
        Ok(CloseDecision::Prompt(descriptor)) => {
            api.prevent_close();
            show_unsaved_prompt(window, descriptor);
        }
        Ok(CloseDecision::Ignore) => api.prevent_close(),
        Err(error) => tracing::warn!(%error, "unexpected close request"),
    }
}

fn prompt_buttons(descriptor: &UnsavedStateDescriptor) -> MessageDialogButtons {
    match (descriptor.button(0), descriptor.button(1), descriptor.button(2)) {
        (Some(first), Some(second), Some(third)) => MessageDialogButtons::YesNoCancelCustom(
            first.to_string(),
            second.to_string(),
            third.to_string(),
        ),
        (Some(first), Some(second), None) => {
            MessageDialogButtons::OkCancelCustom(first.to_string(), second.to_string())
        }
        (Some(first), None, _) => MessageDialogButtons::OkCustom(first.to_string()),
        _ => MessageDialogButtons::OkCancel,
    }
}

fn prompt_choice(
    result: &MessageDialogResult,
    descriptor: &UnsavedStateDescriptor,
) -> PromptChoice {
    match result {
        MessageDialogResult::Ok | MessageDialogResult::Yes => PromptChoice::First,
        MessageDialogResult::No => PromptChoice::Second,
        MessageDialogResult::Custom(label) if descriptor.button(0) == Some(label.as_str()) => {
            PromptChoice::First
        }
        MessageDialogResult::Custom(label) if descriptor.button(1) == Some(label.as_str()) => {
            PromptChoice::Second
        }
        _ => PromptChoice::Dismissed,
    }
}

fn show_unsaved_prompt<R: Runtime>(window: &Window<R>, descriptor: UnsavedStateDescriptor) {
    let callback_window = window.clone();
    window
        .dialog()
        .message(descriptor.message())
        .title(DEFAULT_WINDOW_TITLE)
        .parent(window)
        .buttons(prompt_buttons(&descriptor))
        .show_with_result(move |result| {
            let choice = prompt_choice(&result, &descriptor);
            tracing::debug!(?choice, "unsaved changes prompt closed");
            apply_prompt_choice(&callback_window, choice);
        });
}

fn apply_prompt_choice<R: Runtime>(window: &Window<R>, choice: PromptChoice) {
    let context = window.state::<AppContext>();
    let outcome = context.lifecycle().resolve_prompt(choice);
    match outcome {
        Ok(PromptOutcome::RunSaveCheck) => {
            let Some(webview) = window.app_handle().get_webview_window(MAIN_WINDOW_LABEL) else {
                tracing::warn!("save check skipped: main window not found");
                return;
            };
            if let Err(error) = webview.eval(SAVE_CHECK_SCRIPT) {
                tracing::error!(%error, "failed to run save check");
            }
        }
        Ok(PromptOutcome::CloseAfterDelay) => {
            let window = window.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(DISCARD_CLOSE_DELAY_MS));
                if let Err(error) = window.close() {
                    tracing::error!(%error, "failed to close main window after discard");
                }
            });
        }
        Ok(PromptOutcome::StayOpen) => {}
        Err(error) => tracing::warn!(%error, "stale prompt result"),
    }
}

pub(crate) fn handle_window_destroyed<R: Runtime>(window: &Window<R>) {
    let app_handle = window.app_handle();
    let context = app_handle.state::<AppContext>();
    {
        let mut lifecycle = context.lifecycle();
        match lifecycle.close_completed() {
            Ok(()) => tracing::debug!(
                transitions = lifecycle.history().len(),
                "main window closed"
            ),
            Err(error) => tracing::warn!(%error, "window destroyed outside a close"),
        }
    }

    let version_report = {
        let log_watch = context.log_watch();
        log_watch
            .captures_version()
            .then(|| log_watch.version_report())
    };
    if let Some(report) = version_report {
        if let Some(report) = report {
            println!("{report}");
        }
        app_handle.exit(0);
    }
}

/// Recreates the main window after the last one was closed.
pub(crate) fn reactivate<R: Runtime>(app_handle: &AppHandle<R>) {
    let context = app_handle.state::<AppContext>();
    let reopen = context.lifecycle().reactivate();
    match reopen {
        Ok(true) => {
            if let Err(error) = create_main_window(app_handle, &LaunchConfig::default()) {
                tracing::error!(%error, "failed to recreate main window");
            }
        }
        Ok(false) => focus_main_window(app_handle),
        Err(error) => tracing::warn!(%error, "reactivation rejected"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(buttons: &[&str]) -> UnsavedStateDescriptor {
        UnsavedStateDescriptor::new(
            "Do you want to save your changes?".to_string(),
            buttons.iter().map(|label| label.to_string()).collect(),
        )
        .expect("descriptor")
    }

    #[test]
    fn prompt_keeps_up_to_three_labels() {
        let three = descriptor(&["Save", "Don't save", "Cancel"]);
        assert!(matches!(
            prompt_buttons(&three),
            MessageDialogButtons::YesNoCancelCustom(first, second, third)
                if first == "Save" && second == "Don't save" && third == "Cancel"
        ));

        let two = descriptor(&["Save", "Don't save"]);
        assert!(matches!(
            prompt_buttons(&two),
            MessageDialogButtons::OkCancelCustom(first, second)
                if first == "Save" && second == "Don't save"
        ));

        let one = descriptor(&["Close"]);
        assert!(matches!(
            prompt_buttons(&one),
            MessageDialogButtons::OkCustom(label) if label == "Close"
        ));
    }

    #[test]
    fn dialog_results_map_to_button_index() {
        let labels = descriptor(&["Save", "Don't save"]);
        assert_eq!(
            prompt_choice(&MessageDialogResult::Custom("Save".to_string()), &labels),
            PromptChoice::First
        );
        assert_eq!(
            prompt_choice(&MessageDialogResult::Custom("Don't save".to_string()), &labels),
            PromptChoice::Second
        );
        assert_eq!(
            prompt_choice(&MessageDialogResult::Ok, &labels),
            PromptChoice::First
        );
        assert_eq!(
            prompt_choice(&MessageDialogResult::Custom("Other".to_string()), &labels),
            PromptChoice::Dismissed
        );
    }

    #[test]
    fn cancel_never_discards() {
        let labels = descriptor(&["Save", "Don't save"]);
        assert_eq!(
            prompt_choice(&MessageDialogResult::Cancel, &labels),
            PromptChoice::Dismissed
        );
    }

    #[test]
    fn third_label_keeps_the_window_open() {
        let labels = descriptor(&["Save", "Don't save", "Cancel"]);
        assert_eq!(
            prompt_choice(&MessageDialogResult::Custom("Cancel".to_string()), &labels),
            PromptChoice::Dismissed
        );
        assert_eq!(
            prompt_choice(&MessageDialogResult::Custom("Don't save".to_string()), &labels),
            PromptChoice::Second
        );
    }
}
