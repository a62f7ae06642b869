mod archive;
mod error;
mod launch;
mod logging;
mod options;
mod process_wait;
mod updater;

#[cfg(test)]
mod test_support;

use std::ffi::OsString;
use std::path::PathBuf;

use clap::Parser;
use log::{error, info};

use error::UpdateError;
use options::UpdaterOptions;

/// Result of reading the command line.
enum Startup {
    Run(UpdaterOptions),
    /// `--help` / `--version`: clap prints these itself.
    Print(clap::Error),
    Failed(String),
}

fn startup<I, T>(args: I) -> Startup
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match UpdaterOptions::try_parse_from(args) {
        Ok(options) => Startup::Run(options),
        Err(e) if !e.use_stderr() => Startup::Print(e),
        Err(e) => Startup::Failed(format!("Parse command line arguments error: {}", e)),
    }
}

/// Log directory to use when the command line could not be parsed.
fn fallback_log_dir(env_value: Option<OsString>) -> Option<PathBuf> {
    env_value.filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Text logged for a failed run: validation failures log only the flag name.
fn failure_message(err: UpdateError) -> String {
    match err {
        UpdateError::InvalidOption(name) => name.to_string(),
        other => format!("Unexpected error '{:#}'", anyhow::Error::from(other)),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let options = match startup(std::env::args_os()) {
        Startup::Run(options) => options,
        Startup::Print(e) => {
            let _ = e.print();
            return;
        }
        Startup::Failed(message) => {
            let log_dir = fallback_log_dir(std::env::var_os("UPDATER_LOG_DIR"));
            let _logger = logging::init_logging(log_dir.as_deref());
            error!("{}", message);
            return;
        }
    };

    // Keep the handle alive until exit so file output is flushed.
    let _logger = match logging::init_logging(options.log_dir.as_deref()) {
        Ok(handle) => Some(handle),
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            None
        }
    };
    info!("Updater started for pid {}", options.pid);

    match updater::execute(options).await {
        Ok(report) => info!(
            "Removed {} old file(s), wrote {} file(s), launched {:?}",
            report.removed_files, report.installed.files_written, report.launched_pid
        ),
        Err(e) => error!("{}", failure_message(e)),
    }
}
