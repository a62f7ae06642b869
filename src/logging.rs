use std::path::Path;

use anyhow::Result;
use flexi_logger::{Age, Cleanup, Criterion, Duplicate, FileSpec, Logger, LoggerHandle, Naming};

/// Default level: a successful run stays silent. `RUST_LOG` overrides it.
const DEFAULT_LOG_SPEC: &str = "error";

/// Initialize logging for the updater.
///
/// With a log directory, output goes to daily-rotated files there and errors
/// are duplicated to stderr. Without one, everything goes to stderr.
pub fn init_logging(log_dir: Option<&Path>) -> Result<LoggerHandle> {
    let logger = Logger::try_with_env_or_str(DEFAULT_LOG_SPEC)?;

    let logger = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            logger
                .log_to_file(
                    FileSpec::default()
                        .directory(dir)
                        .basename("app_updater")
                        .suffix("log"),
                )
                .duplicate_to_stderr(Duplicate::Error)
                .rotate(
                    Criterion::Age(Age::Day),
                    Naming::Numbers,
                    Cleanup::KeepLogFiles(7),
                )
        }
        None => logger.log_to_stderr(),
    };

    Ok(logger.start()?)
}
