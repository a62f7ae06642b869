use std::path::{Path, PathBuf};

use thiserror::Error;

/// Everything that can abort an update run.
#[derive(Debug, Error)]
pub enum UpdateError {
    /// A path option failed validation. Carries only the flag name.
    #[error("{0}")]
    InvalidOption(&'static str),

    #[error("failed to query process {pid}: {reason}")]
    ProcessQuery { pid: u32, reason: String },

    #[error("failed to read archive {}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("archive entry '{0}' resolves outside the install directory")]
    UnsafeEntryPath(String),

    #[error("cannot determine working directory for {}", .0.display())]
    MissingWorkingDirectory(PathBuf),

    #[error("invalid argument string '{args}'")]
    InvalidArguments {
        args: String,
        #[source]
        source: shell_words::ParseError,
    },

    #[error("failed to start {}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("file operation failed on {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl UpdateError {
    /// Tags an I/O failure with the path it was working on.
    pub fn io(path: &Path) -> impl FnOnce(std::io::Error) -> UpdateError + '_ {
        move |source| UpdateError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, UpdateError>;
