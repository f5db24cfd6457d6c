use std::{path::PathBuf, time::Duration};

use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use thiserror::Error;
use tokio::task::JoinError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("directory `{0}` does not exist")]
    DirectoryDoesNotExist(PathBuf),

    #[error("failed to open `{path}` for uploading: {source}")]
    OpenBackup {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("deadline exceeded after {0:?}")]
    Timeout(Duration),

    #[error("failed to watch `{path}`: {source}")]
    WatchSetup {
        path: PathBuf,
        source: notify::Error,
    },

    #[error("filesystem monitor stopped")]
    MonitorStopped,

    #[error("`{0}` is not a valid backup name")]
    InvalidBackupName(String),

    #[error("`{0}` is not a valid Unix millis timestamp")]
    InvalidTimestamp(i64),

    #[error("`{0}` is not a backup")]
    NotABackup(String),

    #[error("multipart upload response has no upload id")]
    MissingUploadId,

    #[error("monitor error: {source}")]
    Watch {
        #[from]
        source: notify::Error,
    },

    #[error("{source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("{source}")]
    Join {
        #[from]
        source: JoinError,
    },

    #[error("{source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Sdk(String),
}

impl<E, R> From<SdkError<E, R>> for Error
where
    E: std::error::Error + 'static,
    R: std::fmt::Debug,
{
    fn from(error: SdkError<E, R>) -> Self {
        Error::Sdk(DisplayErrorContext(error).to_string())
    }
}
