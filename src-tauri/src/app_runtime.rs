use std::{env, path::PathBuf, process};

use tauri::{webview::PageLoadEvent, App, Manager, RunEvent, WindowEvent};

use crate::{
    evaluator::{self, EvaluatorHandle},
    launch_config::{self, LaunchConfig},
    launch_options::{self, LaunchOptions},
    log_watch::LogWatch,
    logging, main_window, process_control, resource_protocol, AppContext, APP_PROTOCOL_SCHEME,
    MAIN_WINDOW_LABEL, RESOURCE_DIR_ENV,
};

fn resolve_resource_dir(app: &App) -> PathBuf {
    if let Some(dir) = env::var_os(RESOURCE_DIR_ENV).filter(|value| !value.is_empty()) {
        return PathBuf::from(dir);
    }
    app.path().resource_dir().unwrap_or_else(|error| {
        tracing::warn!(%error, "failed to resolve resource directory; using working directory");
        env::current_dir().unwrap_or_default()
    })
}

fn setup_app(
    app: &mut App,
    options: &LaunchOptions,
    evaluator: EvaluatorHandle,
) -> Result<(), String> {
    let resource_dir = resolve_resource_dir(app);
    tracing::info!(path = %resource_dir.display(), "serving resources");
    let app_config = launch_config::load_app_config(&resource_dir);
    let launch = LaunchConfig::from_options(options);
    let log_watch = LogWatch::new(options.log_exit_pattern.as_deref(), options.capture_version);

    app.manage(AppContext::new(
        evaluator,
        log_watch,
        resource_dir,
        app_config.clone(),
        launch.clone(),
    ));

    let app_handle = app.handle();
    app_handle
        .state::<AppContext>()
        .lifecycle()
        .host_ready()
        .map_err(|error| error.to_string())?;
    main_window::create_main_window(app_handle, &launch)?;

    process_control::spawn_auto_update(&app_config);
    Ok(())
}

pub(crate) fn run() {
    let options = launch_options::parse_launch_options(env::args().skip(1));
    if options.help {
        let program = env::args().next().unwrap_or_else(|| "geogebra".to_string());
        println!("{}", launch_options::usage(&program));
        return;
    }

    logging::init_logging(options.diagnostics);
    launch_options::warn_unrecognized(&options);
    if let Some(hook) = &options.installer_hook {
        tracing::info!(%hook, "installer hook, no GUI, exiting");
        return;
    }

    let evaluator =
        EvaluatorHandle::initialize(options.force_fallback, evaluator::library_path_from_env());
    if let Some(reason) = evaluator.fallback_reason() {
        tracing::warn!(%reason, "symbolic evaluator unavailable; results will be \"?\"");
    }

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, argv, _cwd| {
            tracing::debug!(?argv, "second instance launched");
            main_window::focus_main_window(app_handle);
        }))
        .plugin(tauri_plugin_dialog::init())
        .register_uri_scheme_protocol(APP_PROTOCOL_SCHEME, |ctx, request| {
            resource_protocol::handle_protocol_request(
                ctx.app_handle(),
                APP_PROTOCOL_SCHEME,
                &request,
            )
        })
        .invoke_handler(tauri::generate_handler![
            crate::bridge_commands::bridge_giac,
            crate::bridge_commands::bridge_log,
            crate::bridge_commands::bridge_clipboard,
        ])
        .on_window_event(|window, event| {
            if window.label() != MAIN_WINDOW_LABEL {
                return;
            }

            match event {
                WindowEvent::CloseRequested { api, .. } => {
                    main_window::handle_close_requested(window, api);
                }
                WindowEvent::Destroyed => main_window::handle_window_destroyed(window),
                _ => {}
            }
        })
        .on_page_load(|webview, payload| {
            if let PageLoadEvent::Finished = payload.event() {
                tracing::debug!(url = %payload.url(), "page-load finished");
                if let Some(window) = webview.app_handle().get_webview_window(webview.label()) {
                    main_window::reveal_main_window(&window);
                }
            }
        })
        .setup(move |app| {
            setup_app(app, &options, evaluator)?;
            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(error) => {
            tracing::error!(%error, "error while building tauri application");
            process::exit(1);
        }
    };

    app.run(|app_handle, event| match event {
        #[cfg(target_os = "macos")]
        RunEvent::Reopen { .. } => main_window::reactivate(app_handle),
        #[cfg(target_os = "macos")]
        RunEvent::ExitRequested { api, code: None, .. } => {
            // Closing the last window keeps the app alive until it is reopened.
            api.prevent_exit();
        }
        RunEvent::Exit => {
            if let Some(context) = app_handle.try_state::<AppContext>() {
                if context.lockdown().exit() {
                    tracing::info!("key blocker stopped on exit");
                }
            }
        }
        _ => {}
    });
}
