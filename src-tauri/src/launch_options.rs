use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LaunchTarget {
    Remote(String),
    LocalFile(PathBuf),
}

/// Options recognized on the shell's command line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LaunchOptions {
    pub(crate) help: bool,
    pub(crate) capture_version: bool,
    pub(crate) diagnostics: bool,
    pub(crate) force_fallback: bool,
    pub(crate) log_exit_pattern: Option<String>,
    pub(crate) debug: bool,
    pub(crate) perspective: Option<String>,
    pub(crate) prerelease: Option<String>,
    pub(crate) installer_hook: Option<String>,
    pub(crate) target: Option<LaunchTarget>,
    pub(crate) unrecognized: Vec<String>,
}

/// Scans `args` (without the program name). Every argument is matched on its
/// own so unknown options never stop the scan; only the final argument may be
/// a URL or file to open.
pub(crate) fn parse_launch_options<I>(args: I) -> LaunchOptions
where
    I: IntoIterator<Item = String>,
{
    let args: Vec<String> = args.into_iter().collect();
    let mut options = LaunchOptions::default();
    let last_index = args.len().checked_sub(1);

    for (index, arg) in args.iter().enumerate() {
        let recognized = apply_option(&mut options, arg);
        if options.help {
            return options;
        }
        if recognized {
            continue;
        }

        if Some(index) == last_index {
            if !options.capture_version {
                options.target = Some(classify_target(arg));
            }
        } else {
            options.unrecognized.push(arg.clone());
        }
    }

    options
}

fn apply_option(options: &mut LaunchOptions, arg: &str) -> bool {
    if arg.starts_with("--help") {
        options.help = true;
    } else if arg.starts_with("--giac=wasm") {
        options.force_fallback = true;
    } else if let Some(pattern) = arg.strip_prefix("--logexit=") {
        options.log_exit_pattern = Some(pattern.to_string());
    } else if arg.starts_with("--silent=false") {
        options.diagnostics = true;
    } else if arg.starts_with("--v") {
        options.capture_version = true;
    } else if arg.starts_with("--debug") {
        options.debug = true;
    } else if let Some(perspective) = arg.strip_prefix("--app=") {
        options.perspective = Some(perspective.to_string());
    } else if let Some(value) = arg.strip_prefix("--prerelease=") {
        options.prerelease = Some(value.to_string());
    } else if arg == "--prerelease" {
        options.prerelease = Some("true".to_string());
    } else if arg.starts_with("--squirrel") {
        if !arg.starts_with("--squirrel-firstrun") {
            options.installer_hook = Some(arg.to_string());
        }
    } else {
        return false;
    }
    true
}

/// Reports options the scan skipped. Runs after logging is initialized since
/// parsing decides the log level.
pub(crate) fn warn_unrecognized(options: &LaunchOptions) {
    for option in &options.unrecognized {
        tracing::warn!(%option, "unrecognized option");
    }
}

fn classify_target(arg: &str) -> LaunchTarget {
    if arg.starts_with("http") {
        LaunchTarget::Remote(arg.to_string())
    } else {
        LaunchTarget::LocalFile(PathBuf::from(arg))
    }
}

pub(crate) fn usage(program: &str) -> String {
    [
        "GeoGebra Classic 6".to_string(),
        "Copyright © The GeoGebra Group\n".to_string(),
        "See https://www.geogebra.org/license for license conditions.".to_string(),
        "See https://www.geogebra.org/team for the list of authors.\n".to_string(),
        format!("Usage: {program} [options] [FILE]\n"),
        "Options:".to_string(),
        "  --help              Print this help message".to_string(),
        "  --v                 Print version".to_string(),
        "  --silent=false      Enable logging".to_string(),
        "  --giac=wasm         Disable native CAS and use WebAssembly instead".to_string(),
        "  --logexit=<text>    Exit when the log contains a given text (as regexp)".to_string(),
    ]
    .join("\n")
}

#[cfg(test)]
mod tests {
    use std::{
        io,
        sync::{Arc, Mutex},
    };

    use super::*;

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().expect("log lock").extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parse(args: &[&str]) -> LaunchOptions {
        parse_launch_options(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_known_flags() {
        let options = parse(&[
            "--silent=false",
            "--giac=wasm",
            "--logexit=ready$",
            "--debug",
            "--app=geometry",
            "--prerelease",
        ]);

        assert!(options.diagnostics);
        assert!(options.force_fallback);
        assert!(options.debug);
        assert_eq!(options.log_exit_pattern.as_deref(), Some("ready$"));
        assert_eq!(options.perspective.as_deref(), Some("geometry"));
        assert_eq!(options.prerelease.as_deref(), Some("true"));
        assert!(options.target.is_none());
        assert!(options.unrecognized.is_empty());
    }

    #[test]
    fn final_argument_is_a_url_or_file() {
        let remote = parse(&["--silent=false", "https://www.geogebra.org/m/abc"]);
        assert_eq!(
            remote.target,
            Some(LaunchTarget::Remote("https://www.geogebra.org/m/abc".to_string()))
        );

        let local = parse(&["drawing.ggb"]);
        assert_eq!(
            local.target,
            Some(LaunchTarget::LocalFile(PathBuf::from("drawing.ggb")))
        );
    }

    #[test]
    fn unknown_options_before_the_last_argument_are_warnings() {
        let options = parse(&["--frobnicate", "--silent=false", "file.ggb"]);
        assert_eq!(options.unrecognized, vec!["--frobnicate".to_string()]);
        assert!(options.diagnostics);
        assert_eq!(
            options.target,
            Some(LaunchTarget::LocalFile(PathBuf::from("file.ggb")))
        );
    }

    #[test]
    fn version_mode_ignores_positional_target() {
        let options = parse(&["--v", "file.ggb"]);
        assert!(options.capture_version);
        assert!(options.target.is_none());
    }

    #[test]
    fn help_stops_parsing() {
        let options = parse(&["--help", "--giac=wasm"]);
        assert!(options.help);
        assert!(!options.force_fallback);
        assert!(usage("geogebra").contains("Usage: geogebra [options] [FILE]"));
    }

    #[test]
    fn installer_hooks_are_recorded_except_first_run() {
        assert_eq!(
            parse(&["--squirrel-install", "6.0.600"]).installer_hook.as_deref(),
            Some("--squirrel-install")
        );
        assert!(parse(&["--squirrel-firstrun"]).installer_hook.is_none());
    }

    #[test]
    fn unrecognized_options_are_warned_once_logging_is_up() {
        let options = parse(&["--frobnicate", "--silent=false", "file.ggb"]);
        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || warn_unrecognized(&options));

        let output = String::from_utf8(log.0.lock().expect("log lock").clone()).expect("utf8");
        assert_eq!(output.matches("unrecognized option").count(), 1);
        assert!(output.contains("--frobnicate"));
        assert!(!output.contains("file.ggb"));
    }
}
