use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use env_logger::{DEFAULT_FILTER_ENV, Target, WriteStyle};
use log::LevelFilter;

use crate::common::error::PsError;

/// Initializes the global logger.
///
/// `debug` takes precedence over `level`, `RUST_LOG` takes precedence over both.
/// When `file` is given, records are appended to it instead of stderr.
pub fn setup_logging(
    debug: bool,
    level: Option<LevelFilter>,
    file: Option<&Path>,
) -> crate::Result<()> {
    let level = if debug {
        LevelFilter::Debug
    } else {
        level.unwrap_or(LevelFilter::Info)
    };
    let env_filter = std::env::var(DEFAULT_FILTER_ENV).unwrap_or_default();
    let detailed =
        level >= LevelFilter::Debug || env_filter.contains("debug") || env_filter.contains("trace");

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if detailed {
        builder.format_timestamp_millis();
    } else {
        // <time> <level> <message>
        builder.format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                buf.timestamp_seconds(),
                record.level(),
                record.args()
            )
        });
    }
    if let Some(path) = file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| {
                PsError::GenericError(format!("Cannot open log file {}: {e}", path.display()))
            })?;
        builder
            .target(Target::Pipe(Box::new(file)))
            .write_style(WriteStyle::Never);
    }
    builder.parse_default_env();
    builder
        .try_init()
        .map_err(|e| PsError::GenericError(format!("Cannot initialize logging: {e}")))
}

#[cfg(test)]
mod tests {
    use crate::common::error::PsError;
    use crate::common::setup::setup_logging;

    #[test]
    fn unwritable_log_file() {
        let dir = tempfile::TempDir::with_prefix("polite").unwrap();
        let path = dir.path().join("missing").join("submit.log");
        assert!(matches!(
            setup_logging(false, None, Some(&path)),
            Err(PsError::GenericError(message)) if message.contains("Cannot open log file")
        ));
    }
}
