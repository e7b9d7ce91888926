use std::sync::LazyLock;

use regex::Regex;

const VERSION_INFO_MARKER: &str = "INFO";
const VERSION_PRODUCT_MARKER: &str = "GeoGebra";

static LEGACY_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"GeoGebra 5(\.\d+\.\d+\.\d+)").expect("legacy version pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogVerdict {
    Continue,
    Exit { version_report: Option<String> },
}

/// Watches front-end log lines for the two unattended exit modes: `--logexit`
/// and `--v` version capture.
#[derive(Debug, Default)]
pub(crate) struct LogWatch {
    exit_pattern: Option<Regex>,
    exit_matched: bool,
    capture_version: bool,
    captured_version: Option<String>,
}

impl LogWatch {
    pub(crate) fn new(exit_pattern: Option<&str>, capture_version: bool) -> Self {
        let exit_pattern = exit_pattern.and_then(|pattern| match Regex::new(pattern) {
            Ok(regex) => Some(regex),
            Err(error) => {
                tracing::warn!(pattern, %error, "ignoring invalid --logexit pattern");
                None
            }
        });

        Self {
            exit_pattern,
            exit_matched: false,
            capture_version,
            captured_version: None,
        }
    }

    pub(crate) fn observe(&mut self, message: &str) -> LogVerdict {
        if let Some(pattern) = &self.exit_pattern {
            if !self.exit_matched && pattern.is_match(message) {
                self.exit_matched = true;
            }
            if self.exit_matched {
                tracing::debug!("exiting due to matching log text");
                return LogVerdict::Exit {
                    version_report: None,
                };
            }
        }

        if self.capture_version {
            // Exit on the call after the capture so the capturing line is
            // fully logged first.
            if self.captured_version.is_some() {
                return LogVerdict::Exit {
                    version_report: self.version_report(),
                };
            }
            if message.contains(VERSION_INFO_MARKER) {
                if let Some(pos) = message.find(VERSION_PRODUCT_MARKER) {
                    self.captured_version = Some(message[pos..].to_string());
                }
            }
        }

        LogVerdict::Continue
    }

    pub(crate) fn captures_version(&self) -> bool {
        self.capture_version
    }

    #[cfg(test)]
    pub(crate) fn captured_version(&self) -> Option<&str> {
        self.captured_version.as_deref()
    }

    /// The front-end still reports the 5.x engine version; the shell ships as 6.x.
    pub(crate) fn version_report(&self) -> Option<String> {
        let captured = self.captured_version.as_deref()?;
        match LEGACY_VERSION.captures(captured) {
            Some(caps) => Some(format!("GeoGebra 6{}", &caps[1])),
            None => Some(captured.trim().to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_capture_exits_on_the_call_after_capture() {
        let mut watch = LogWatch::new(None, true);

        assert_eq!(
            watch.observe("12:00:01 INFO: GeoGebra 5.0.600.0 started"),
            LogVerdict::Continue
        );
        assert_eq!(
            watch.captured_version(),
            Some("GeoGebra 5.0.600.0 started")
        );
        assert_eq!(
            watch.observe("anything"),
            LogVerdict::Exit {
                version_report: Some("GeoGebra 6.0.600.0".to_string())
            }
        );
    }

    #[test]
    fn version_capture_requires_both_markers() {
        let mut watch = LogWatch::new(None, true);

        assert_eq!(watch.observe("GeoGebra 5.0.600.0"), LogVerdict::Continue);
        assert_eq!(watch.observe("INFO: applet loaded"), LogVerdict::Continue);
        assert_eq!(watch.captured_version(), None);
        assert_eq!(watch.observe("still running"), LogVerdict::Continue);
    }

    #[test]
    fn log_exit_latches_after_first_match() {
        let mut watch = LogWatch::new(Some("applet.*ready"), false);

        assert_eq!(watch.observe("loading"), LogVerdict::Continue);
        assert_eq!(
            watch.observe("the applet is ready"),
            LogVerdict::Exit {
                version_report: None
            }
        );
        assert_eq!(
            watch.observe("unrelated"),
            LogVerdict::Exit {
                version_report: None
            }
        );
    }

    #[test]
    fn invalid_exit_pattern_is_ignored() {
        let mut watch = LogWatch::new(Some("(unclosed"), false);
        assert_eq!(watch.observe("(unclosed"), LogVerdict::Continue);
    }

    #[test]
    fn version_report_keeps_non_legacy_versions() {
        let mut watch = LogWatch::new(None, true);
        watch.observe("INFO GeoGebra 6.0.700.0");
        assert_eq!(watch.version_report(), Some("GeoGebra 6.0.700.0".to_string()));
    }
}
