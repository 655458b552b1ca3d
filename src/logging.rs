use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingSettings;

pub const LOG_FILE: &str = "workflow.log";

/// Keeps the background log writer alive; drop it only at process exit.
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Human-readable stderr output plus a plain-text file under `<output_dir>/logs`.
///
/// The file layer is skipped when its directory cannot be created.
pub fn init(settings: &LoggingSettings, output_dir: &Path, verbose: bool) -> LoggingGuard {
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(build_filter(&settings.level, verbose));

    let log_dir = output_dir.join("logs");
    let (file_layer, guard) = match std::fs::create_dir_all(&log_dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(&log_dir, LOG_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(build_filter(&settings.level, verbose));
            (Some(layer), Some(guard))
        }
        Err(err) => {
            eprintln!(
                "warning: file logging disabled, cannot create {}: {err}",
                log_dir.display()
            );
            (None, None)
        }
    };

    // a subscriber may already be installed (tests, embedding)
    let _ = tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .try_init();

    LoggingGuard { _file: guard }
}

fn build_filter(configured: &str, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(configured))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
