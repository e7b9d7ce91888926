use tauri::{AppHandle, Manager};

use crate::{
    clipboard::{self, ClipboardBackend, SystemClipboard},
    log_watch::LogVerdict,
    AppContext, BridgeReply, BridgeRequest, GIAC_CALL_PREFIX,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ExitRequest {
    pub(crate) version_report: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BridgeOutcome {
    pub(crate) reply: BridgeReply,
    pub(crate) exit: Option<ExitRequest>,
}

impl BridgeOutcome {
    fn reply(reply: BridgeReply) -> Self {
        Self { reply, exit: None }
    }
}

/// Strips trailing `;` and wraps the command in `caseval(...)` unless the
/// front-end already did.
pub(crate) fn normalize_giac_command(command: &str) -> String {
    let trimmed = command.trim_end_matches(';');
    if trimmed.starts_with(GIAC_CALL_PREFIX) {
        trimmed.to_string()
    } else {
        format!("{GIAC_CALL_PREFIX}{trimmed})")
    }
}

pub(crate) fn handle_bridge_request(
    context: &AppContext,
    clipboard_backend: &impl ClipboardBackend,
    request: BridgeRequest,
) -> BridgeOutcome {
    match request {
        BridgeRequest::Evaluate(command) => {
            let command = normalize_giac_command(&command);
            let result = context.evaluator.evaluate(&command);
            tracing::debug!(target: "giac", "{command} -> {result}");
            BridgeOutcome::reply(BridgeReply::Text(result))
        }
        BridgeRequest::Log(message) => {
            tracing::debug!(target: "geogebra", "{message}");
            let verdict = context.log_watch().observe(&message);
            BridgeOutcome {
                reply: BridgeReply::Ack(true),
                exit: match verdict {
                    LogVerdict::Continue => None,
                    LogVerdict::Exit { version_report } => Some(ExitRequest { version_report }),
                },
            }
        }
        BridgeRequest::ClipboardImage(data_url) => {
            if let Err(error) = clipboard::copy_data_url_image(clipboard_backend, &data_url) {
                tracing::error!(%error, "failed to copy image to clipboard");
            }
            BridgeOutcome::reply(BridgeReply::Ack(true))
        }
    }
}

/// Ends an unattended run (`--v`, `--logexit`) with exit code 0.
pub(crate) fn finish_unattended_run(app_handle: &AppHandle, exit: ExitRequest) {
    if let Some(report) = exit.version_report {
        println!("{report}");
    }
    app_handle.exit(0);
}

fn dispatch(app_handle: &AppHandle, request: BridgeRequest) -> BridgeReply {
    let context = app_handle.state::<AppContext>();
    let outcome = handle_bridge_request(&context, &SystemClipboard, request);
    if let Some(exit) = outcome.exit {
        finish_unattended_run(app_handle, exit);
    }
    outcome.reply
}

#[tauri::command]
pub(crate) fn bridge_giac(app_handle: AppHandle, command: String) -> BridgeReply {
    dispatch(&app_handle, BridgeRequest::Evaluate(command))
}

#[tauri::command]
pub(crate) fn bridge_log(app_handle: AppHandle, message: String) -> BridgeReply {
    dispatch(&app_handle, BridgeRequest::Log(message))
}

#[tauri::command]
pub(crate) fn bridge_clipboard(app_handle: AppHandle, data: String) -> BridgeReply {
    dispatch(&app_handle, BridgeRequest::ClipboardImage(data))
}
