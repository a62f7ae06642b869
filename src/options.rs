use std::path::{Path, PathBuf};

use clap::Parser;

use crate::error::{Result, UpdateError};

/// Command line accepted from the parent application.
#[derive(Parser, Debug, Clone)]
#[command(name = "app_updater", version, about = "Installs a new application version after the running one exits")]
pub struct UpdaterOptions {
    /// Process id to wait for before touching the install directory
    #[arg(long = "pid", allow_negative_numbers = true)]
    pub pid: i64,

    /// Archive listing the files of the currently installed version
    #[arg(long = "old-version-archive")]
    pub old_version_archive: Option<String>,

    /// Archive to extract into the install directory
    #[arg(long = "new-version-archive")]
    pub new_version_archive: PathBuf,

    /// Installation directory, must already exist
    #[arg(long = "app-dir-path")]
    pub app_dir_path: PathBuf,

    /// Executable to start once the install is complete
    #[arg(long = "execute-on-exit")]
    pub execute_on_exit: Option<String>,

    /// Argument string passed to the executable
    #[arg(long = "execute-on-exit-args", allow_hyphen_values = true)]
    pub execute_on_exit_args: Option<String>,

    /// Write rotated log files to this directory instead of stderr
    #[arg(long = "log-dir", env = "UPDATER_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Successor process to start after installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostExec {
    pub program: PathBuf,
    pub args: String,
}

/// Validated, immutable run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateConfig {
    pub pid: i64,
    pub old_archive: Option<PathBuf>,
    pub new_archive: PathBuf,
    pub install_dir: PathBuf,
    pub post_exec: Option<PostExec>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl UpdaterOptions {
    /// Check every path option once, before anything is mutated.
    ///
    /// Checks run in a fixed order and the first failure wins; the error
    /// carries only the name of the offending flag.
    pub fn validate(self) -> Result<UpdateConfig> {
        if !self.app_dir_path.is_dir() {
            return Err(UpdateError::InvalidOption("app-dir-path"));
        }

        let old_archive = non_blank(self.old_version_archive).map(PathBuf::from);
        if let Some(path) = &old_archive {
            if !path.is_file() {
                return Err(UpdateError::InvalidOption("old-version-archive"));
            }
        }

        if !self.new_version_archive.is_file() {
            return Err(UpdateError::InvalidOption("new-version-archive"));
        }

        let post_exec = match non_blank(self.execute_on_exit) {
            Some(program) => {
                if !Path::new(&program).is_file() {
                    return Err(UpdateError::InvalidOption("execute-on-exit"));
                }
                Some(PostExec {
                    program: PathBuf::from(program),
                    args: non_blank(self.execute_on_exit_args).unwrap_or_default(),
                })
            }
            None => None,
        };

        Ok(UpdateConfig {
            pid: self.pid,
            old_archive,
            new_archive: self.new_version_archive,
            install_dir: self.app_dir_path,
            post_exec,
        })
    }
}
