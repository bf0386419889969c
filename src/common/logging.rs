//! Logging and tracing configuration
//!
//! Logs go to stderr and, unless disabled, to a daily rolling file in the
//! configured log directory.

use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix of the rolling log file
const LOG_FILE_PREFIX: &str = "apichain.log";

fn default_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("apichain=debug,warn")
        } else {
            EnvFilter::new("apichain=info,warn")
        }
    })
}

/// Initialize tracing for the CLI (stderr only)
///
/// Logs are controlled by the `RUST_LOG` environment variable.
/// Default level is INFO for this crate, WARN for dependencies.
pub fn init_cli(verbose: bool) {
    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

/// Initialize tracing for a test run (stderr + daily rolling file)
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for the whole run. Falls back to stderr only when the log directory cannot
/// be created.
pub fn init_run(verbose: bool, log_dir: &Path) -> Option<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!(
            "Warning: Could not create log directory '{}': {}",
            log_dir.display(),
            e
        );
        init_cli(verbose);
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(false)
        .with_line_number(false);

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    tracing_subscriber::registry()
        .with(default_filter(verbose))
        .with(file_layer)
        .with(stderr_layer)
        .init();

    Some(guard)
}
