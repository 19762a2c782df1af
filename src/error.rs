use thiserror::Error;
use std::path::PathBuf;

#[derive(Debug, Error)]
pub enum ArtsyncError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("SSH connection failed: {0}")]
    Connection(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Remote command failed: {0}")]
    RemoteCommand(String),

    #[error("File {path:?} has hash {actual} while it should have {expected}")]
    HashMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{path:?} is not relative to {base:?}")]
    NotRelative { path: PathBuf, base: PathBuf },

    #[error("IO error on {path:?}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Manifest parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Pattern error: {0}")]
    Pattern(#[from] regex::Error),

    #[error("Session is closed")]
    SessionClosed,
}

impl ArtsyncError {
    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File { path: path.into(), source }
    }

    /// Whether this error means the remote channel can no longer be used.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Authentication(_))
    }
}
