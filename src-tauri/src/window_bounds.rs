use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::{WINDOW_BOUNDS_SETTING, WINDOW_STATE_FILE};

#[derive(Debug, Error)]
pub(crate) enum BoundsError {
    #[error("failed to create window state directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read window state {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize window state: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write window state {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Logical window position and size, as restored on the next launch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub(crate) struct WindowBounds {
    pub(crate) x: f64,
    pub(crate) y: f64,
    pub(crate) width: f64,
    pub(crate) height: f64,
}

impl WindowBounds {
    fn is_usable(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|value| value.is_finite())
            && self.width > 0.0
            && self.height > 0.0
    }
}

fn empty_state_object() -> Value {
    Value::Object(Map::new())
}

pub(crate) fn window_state_path(config_dir: &Path) -> PathBuf {
    config_dir.join(WINDOW_STATE_FILE)
}

pub(crate) fn read_window_bounds(state_path: &Path) -> Option<WindowBounds> {
    let raw = fs::read_to_string(state_path).ok()?;
    let parsed: Value = serde_json::from_str(&raw).ok()?;
    let bounds: WindowBounds =
        serde_json::from_value(parsed.get(WINDOW_BOUNDS_SETTING)?.clone()).ok()?;
    bounds.is_usable().then_some(bounds)
}

/// Stores `bounds` under the bounds key, keeping any other settings in the file.
pub(crate) fn write_window_bounds(
    state_path: &Path,
    bounds: WindowBounds,
) -> Result<(), BoundsError> {
    if let Some(parent_dir) = state_path.parent() {
        fs::create_dir_all(parent_dir).map_err(|source| BoundsError::CreateDir {
            path: parent_dir.to_path_buf(),
            source,
        })?;
    }

    let mut parsed = match fs::read_to_string(state_path) {
        Ok(raw) => match serde_json::from_str::<Value>(&raw) {
            Ok(value) if value.is_object() => value,
            Ok(_) => {
                tracing::warn!(
                    path = %state_path.display(),
                    "window state has non-object root; resetting state file"
                );
                empty_state_object()
            }
            Err(error) => {
                tracing::warn!(
                    %error,
                    path = %state_path.display(),
                    "failed to parse window state; resetting state file"
                );
                empty_state_object()
            }
        },
        Err(error) if error.kind() == std::io::ErrorKind::NotFound => empty_state_object(),
        Err(source) => {
            return Err(BoundsError::Read {
                path: state_path.to_path_buf(),
                source,
            });
        }
    };

    if let Value::Object(object) = &mut parsed {
        object.insert(
            WINDOW_BOUNDS_SETTING.to_string(),
            serde_json::to_value(bounds)?,
        );
    }

    let serialized = serde_json::to_string_pretty(&parsed)?;
    fs::write(state_path, serialized).map_err(|source| BoundsError::Write {
        path: state_path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOUNDS: WindowBounds = WindowBounds {
        x: 40.0,
        y: 60.0,
        width: 1280.0,
        height: 800.0,
    };

    #[test]
    fn bounds_round_trip_through_state_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = window_state_path(&dir.path().join("nested"));

        assert_eq!(read_window_bounds(&path), None);
        write_window_bounds(&path, BOUNDS).expect("write bounds");
        assert_eq!(read_window_bounds(&path), Some(BOUNDS));
    }

    #[test]
    fn write_keeps_unrelated_settings() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = window_state_path(dir.path());
        fs::write(&path, r#"{"zoom":2}"#).expect("seed state");

        write_window_bounds(&path, BOUNDS).expect("write bounds");
        let parsed: Value =
            serde_json::from_str(&fs::read_to_string(&path).expect("read state")).expect("json");
        assert_eq!(parsed["zoom"], 2);
        assert_eq!(parsed["winBounds"]["width"], 1280.0);
    }

    #[test]
    fn corrupt_state_is_reset_on_write() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = window_state_path(dir.path());
        fs::write(&path, "[1, 2").expect("seed state");

        assert_eq!(read_window_bounds(&path), None);
        write_window_bounds(&path, BOUNDS).expect("write bounds");
        assert_eq!(read_window_bounds(&path), Some(BOUNDS));
    }

    #[test]
    fn degenerate_bounds_are_ignored() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = window_state_path(dir.path());
        fs::write(
            &path,
            r#"{"winBounds":{"x":0,"y":0,"width":0,"height":600}}"#,
        )
        .expect("seed state");

        assert_eq!(read_window_bounds(&path), None);
    }
}
