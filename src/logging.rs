use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::errors::{config_error, ChargebackResult};

pub const LOG_FILE_PREFIX: &str = "chargeback.log";

/// Installs the global subscriber: stdout plus a daily-rolling file under
/// `log_dir`. `RUST_LOG` overrides `default_level`.
///
/// Keep the returned guard alive for the whole process or buffered file
/// output is lost on exit.
pub fn init_tracing(log_dir: &Path, default_level: &str) -> ChargebackResult<WorkerGuard> {
    std::fs::create_dir_all(log_dir).map_err(config_error)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(config_error)?;

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .try_init()
        .map_err(config_error)?;

    Ok(guard)
}
