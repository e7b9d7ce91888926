use std::{
    path::PathBuf,
    sync::{Mutex, MutexGuard, PoisonError},
};

use serde::Serialize;

use crate::{
    evaluator::EvaluatorHandle,
    launch_config::{AppConfig, LaunchConfig},
    lockdown::LockdownState,
    log_watch::LogWatch,
    window_lifecycle::WindowLifecycle,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum BridgeRequest {
    Evaluate(String),
    Log(String),
    ClipboardImage(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum BridgeReply {
    Text(String),
    Ack(bool),
}

/// Process-wide state shared by the bridge, the resource protocol and the
/// window lifecycle. Managed by Tauri, so every mutable field sits behind a
/// mutex even though requests are serviced one at a time.
#[derive(Debug)]
pub(crate) struct AppContext {
    pub(crate) evaluator: EvaluatorHandle,
    pub(crate) resource_dir: PathBuf,
    pub(crate) app_config: AppConfig,
    pub(crate) launch: LaunchConfig,
    lifecycle: Mutex<WindowLifecycle>,
    lockdown: Mutex<LockdownState>,
    log_watch: Mutex<LogWatch>,
}

impl AppContext {
    pub(crate) fn new(
        evaluator: EvaluatorHandle,
        log_watch: LogWatch,
        resource_dir: PathBuf,
        app_config: AppConfig,
        launch: LaunchConfig,
    ) -> Self {
        Self {
            evaluator,
            resource_dir,
            app_config,
            launch,
            lifecycle: Mutex::new(WindowLifecycle::new()),
            lockdown: Mutex::new(LockdownState::default()),
            log_watch: Mutex::new(log_watch),
        }
    }

    pub(crate) fn lifecycle(&self) -> MutexGuard<'_, WindowLifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn lockdown(&self) -> MutexGuard<'_, LockdownState> {
        self.lockdown.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn log_watch(&self) -> MutexGuard<'_, LogWatch> {
        self.log_watch.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
pub(crate) fn test_context(resource_dir: PathBuf) -> AppContext {
    AppContext::new(
        EvaluatorHandle::fallback("test".to_string()),
        LogWatch::default(),
        resource_dir,
        AppConfig::default(),
        LaunchConfig::default(),
    )
}
