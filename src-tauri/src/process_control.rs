use std::{
    env,
    path::{Path, PathBuf},
    process::{Child, Command, Stdio},
};

use thiserror::Error;

use crate::{launch_config::AppConfig, UPDATER_EXECUTABLE};

#[derive(Debug, Error)]
pub(crate) enum SpawnError {
    #[error("cannot locate the running executable: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("executable {} does not exist", .0.display())]
    MissingExecutable(PathBuf),
    #[error("invalid command line: {0}")]
    InvalidCommand(String),
    #[error("failed to spawn {command:?}: {source}")]
    Spawn {
        command: Vec<String>,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SpawnPlan {
    pub(crate) cmd: PathBuf,
    pub(crate) args: Vec<String>,
}

impl SpawnPlan {
    pub(crate) fn from_command_line(command_line: &str) -> Result<Self, SpawnError> {
        let mut pieces = shlex::split(command_line)
            .ok_or_else(|| SpawnError::InvalidCommand(command_line.to_string()))?;
        if pieces.is_empty() {
            return Err(SpawnError::InvalidCommand(command_line.to_string()));
        }

        let cmd = PathBuf::from(pieces.remove(0));
        Ok(Self { cmd, args: pieces })
    }

    /// Plan for an executable shipped next to (or relative to) the shell binary.
    pub(crate) fn sibling(relative: &str, args: &[&str]) -> Result<Self, SpawnError> {
        let exe = env::current_exe().map_err(SpawnError::CurrentExe)?;
        let base = exe.parent().unwrap_or_else(|| Path::new("."));
        Ok(Self {
            cmd: base.join(relative),
            args: args.iter().map(|arg| arg.to_string()).collect(),
        })
    }

    fn debug_command(&self) -> Vec<String> {
        let mut parts = vec![self.cmd.to_string_lossy().to_string()];
        parts.extend(self.args.clone());
        parts
    }
}

/// Starts the process without waiting on it. Relative or bare commands are
/// left to `PATH` lookup; absolute paths must exist.
pub(crate) fn spawn_detached(plan: &SpawnPlan) -> Result<Child, SpawnError> {
    if plan.cmd.is_absolute() && !plan.cmd.is_file() {
        return Err(SpawnError::MissingExecutable(plan.cmd.clone()));
    }

    Command::new(&plan.cmd)
        .args(&plan.args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|source| SpawnError::Spawn {
            command: plan.debug_command(),
            source,
        })
}

pub(crate) fn stop_child_process(child: &mut Child) {
    #[cfg(target_os = "windows")]
    {
        let _ = Command::new("taskkill")
            .args(["/pid", &child.id().to_string(), "/t", "/f"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .stdin(Stdio::null())
            .status();
        let _ = child.wait();
    }

    #[cfg(not(target_os = "windows"))]
    {
        let _ = child.kill();
        let _ = child.wait();
    }
}

pub(crate) fn auto_update_args(config: &AppConfig) -> Vec<String> {
    vec!["--update".to_string(), config.update_feed_url()]
}

/// Hands update checks to the installer's updater. Only Windows installs ship one.
pub(crate) fn spawn_auto_update(config: &AppConfig) {
    if !cfg!(target_os = "windows") {
        tracing::debug!(platform = env::consts::OS, "no autoupdate for this platform");
        return;
    }

    let args = auto_update_args(config);
    let plan = match SpawnPlan::sibling(UPDATER_EXECUTABLE, &[]) {
        Ok(plan) => SpawnPlan { args, ..plan },
        Err(error) => {
            tracing::error!(%error, "error on spawning updater");
            return;
        }
    };

    match spawn_detached(&plan) {
        Ok(child) => tracing::debug!(pid = child.id(), "updater started"),
        Err(error) => tracing::error!(%error, "error on spawning updater"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_plan_splits_quoted_command_line() {
        let plan = SpawnPlan::from_command_line("\"/opt/key blocker/run\" --all -q")
            .expect("command line should parse");
        assert_eq!(plan.cmd, PathBuf::from("/opt/key blocker/run"));
        assert_eq!(plan.args, vec!["--all".to_string(), "-q".to_string()]);
    }

    #[test]
    fn spawn_plan_rejects_empty_or_unbalanced_command_lines() {
        assert!(matches!(
            SpawnPlan::from_command_line("   "),
            Err(SpawnError::InvalidCommand(_))
        ));
        assert!(matches!(
            SpawnPlan::from_command_line("\"unterminated"),
            Err(SpawnError::InvalidCommand(_))
        ));
    }

    #[test]
    fn spawn_detached_reports_missing_absolute_executable() {
        let dir = tempfile::tempdir().expect("temp dir");
        let plan = SpawnPlan {
            cmd: dir.path().join("disablekeys.exe"),
            args: Vec::new(),
        };
        assert!(matches!(
            spawn_detached(&plan),
            Err(SpawnError::MissingExecutable(_))
        ));
    }

    #[test]
    fn sibling_plan_is_resolved_next_to_the_executable() {
        let plan = SpawnPlan::sibling("disablekeys.exe", &["--quiet"]).expect("current exe");
        let exe_dir = env::current_exe()
            .expect("current exe")
            .parent()
            .expect("exe dir")
            .to_path_buf();
        assert_eq!(plan.cmd, exe_dir.join("disablekeys.exe"));
        assert_eq!(plan.args, vec!["--quiet".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn stop_child_process_terminates_running_child() {
        let mut child = spawn_detached(&SpawnPlan {
            cmd: PathBuf::from("sleep"),
            args: vec!["30".to_string()],
        })
        .expect("sleep should spawn");

        stop_child_process(&mut child);
        assert!(child.try_wait().expect("poll child").is_some());
    }
}
