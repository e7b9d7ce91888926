use std::{env, fmt, process::Child};

use crate::{
    process_control::{self, SpawnError, SpawnPlan},
    KEY_BLOCKER_CMD_ENV, KEY_BLOCKER_EXECUTABLE,
};

/// Auxiliary process that swallows OS-level shortcuts while an exam runs.
/// The child is terminated when the handle is dropped.
pub(crate) struct KeyBlockerProcess {
    child: Child,
}

impl KeyBlockerProcess {
    pub(crate) fn spawn(plan: &SpawnPlan) -> Result<Self, SpawnError> {
        process_control::spawn_detached(plan).map(|child| Self { child })
    }

    pub(crate) fn id(&self) -> u32 {
        self.child.id()
    }
}

impl Drop for KeyBlockerProcess {
    fn drop(&mut self) {
        tracing::debug!(pid = self.child.id(), "stopping key blocker");
        process_control::stop_child_process(&mut self.child);
    }
}

impl fmt::Debug for KeyBlockerProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBlockerProcess")
            .field("pid", &self.child.id())
            .finish()
    }
}

#[derive(Debug, Default)]
pub(crate) struct LockdownState {
    locked: bool,
    key_blocker: Option<KeyBlockerProcess>,
}

impl LockdownState {
    pub(crate) fn is_locked(&self) -> bool {
        self.locked
    }

    #[cfg(test)]
    pub(crate) fn has_key_blocker(&self) -> bool {
        self.key_blocker.is_some()
    }

    /// Engages lockdown. `locked` is set even if the key blocker fails to
    /// start; kiosk mode alone still covers most shortcuts.
    pub(crate) fn enter<S>(&mut self, spawn: S)
    where
        S: FnOnce() -> Result<KeyBlockerProcess, SpawnError>,
    {
        self.locked = true;
        if let Some(existing) = &self.key_blocker {
            tracing::debug!(pid = existing.id(), "key blocker already running");
            return;
        }

        match spawn() {
            Ok(process) => {
                tracing::debug!(pid = process.id(), "key blocker started");
                self.key_blocker = Some(process);
            }
            Err(error) => tracing::error!(%error, "error on spawning key blocker"),
        }
    }

    /// Leaves lockdown; returns whether a key blocker had to be stopped.
    pub(crate) fn exit(&mut self) -> bool {
        self.locked = false;
        self.key_blocker.take().is_some()
    }
}

pub(crate) fn key_blocker_plan() -> Result<SpawnPlan, SpawnError> {
    if let Some(custom_cmd) = env::var(KEY_BLOCKER_CMD_ENV)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
    {
        return SpawnPlan::from_command_line(&custom_cmd);
    }

    SpawnPlan::sibling(KEY_BLOCKER_EXECUTABLE, &[])
}

pub(crate) fn spawn_key_blocker() -> Result<KeyBlockerProcess, SpawnError> {
    let plan = key_blocker_plan()?;
    KeyBlockerProcess::spawn(&plan)
}
