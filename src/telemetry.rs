// src/telemetry.rs

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::{Mutex, OnceLock};
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// stderr shares the terminal with the chart, so only errors go there.
const TERMINAL_FILTER: &str = "radio_modules=error,radio=error";
const FILE_FILTER: &str = "radio_modules=info,radio=info";

/// Directives used when `RUST_LOG` is unset.
pub fn default_filter(log_file: Option<&Path>) -> &'static str {
    if log_file.is_some() {
        FILE_FILTER
    } else {
        TERMINAL_FILTER
    }
}

/// Installs the global subscriber once. Logs go to `log_file` when given, else to
/// stderr. A log file that cannot be opened falls back to stderr.
pub fn init(log_file: Option<&Path>) {
    TELEMETRY_INIT.get_or_init(|| {
        let file = log_file.and_then(|path| {
            match OpenOptions::new().create(true).append(true).open(path) {
                Ok(f) => Some(f),
                Err(err) => {
                    eprintln!("[telemetry] cannot open {}: {err}", path.display());
                    None
                }
            }
        });
        let filter_for = if file.is_some() { log_file } else { None };

        let env_filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(default_filter(filter_for)))
            .unwrap_or_else(|_| EnvFilter::default().add_directive(Level::ERROR.into()));

        let builder = fmt().with_env_filter(env_filter).with_target(false);
        let result = match file {
            Some(f) => builder
                .with_ansi(false)
                .with_writer(Mutex::new(f))
                .compact()
                .try_init(),
            None => builder.with_writer(std::io::stderr).compact().try_init(),
        };
        if let Err(err) = result {
            eprintln!("[telemetry] failed to initialise tracing subscriber: {err}");
        }
    });
}
