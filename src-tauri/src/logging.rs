use tracing_subscriber::{fmt, EnvFilter};

const MUTED_FILTER: &str = "info";
const DIAGNOSTIC_FILTER: &str = "debug";

pub(crate) fn default_filter(diagnostics_enabled: bool) -> &'static str {
    if diagnostics_enabled {
        DIAGNOSTIC_FILTER
    } else {
        MUTED_FILTER
    }
}

/// Installs the process-wide diagnostic channel.
///
/// Bridge traffic and lifecycle chatter are emitted at `debug`, so they stay
/// silent unless `--silent=false` was passed. `RUST_LOG` wins over both.
pub(crate) fn init_logging(diagnostics_enabled: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(diagnostics_enabled)));

    if let Err(error) = fmt().with_env_filter(filter).with_target(false).try_init() {
        eprintln!("failed to install diagnostic logger: {error}");
    }
}
