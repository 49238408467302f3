use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_PREFIX: &str = "ai-file-sorter.log";

/// Initialize tracing with RUST_LOG env filter, logging to stderr and a
/// daily rolling file under `log_dir`.
///
/// The returned guard must be kept alive for the file writer to flush.
pub fn init_logging(log_dir: &Path) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,ai_file_sorter=info"));

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let result = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time(),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter)
        .try_init();

    if let Err(e) = result {
        eprintln!("Tracing already initialized: {}", e);
    }

    guard
}
