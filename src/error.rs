use std::path::PathBuf;
use std::process::ExitCode;

use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("the target path {path:?} does not exist")]
    NotFound { path: PathBuf },
    #[error("failed to hash {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot obtain results from VirusTotal: {0}")]
    Network(String),
    #[error("cannot decode VirusTotal response: {0}")]
    Decode(#[from] serde_json::Error),
}

pub type ScanResult<T> = std::result::Result<T, ScanError>;

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::Io {
            path: path.into(),
            source,
        }
    }

    /// Process exit status for this failure.
    pub fn status(&self) -> u8 {
        match self {
            ScanError::Config(_) | ScanError::NotFound { .. } => 1,
            ScanError::Io { .. } => 2,
            ScanError::Network(_) | ScanError::Decode(_) => 3,
        }
    }

    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.status())
    }
}

impl From<reqwest::Error> for ScanError {
    fn from(err: reqwest::Error) -> Self {
        ScanError::Network(err.to_string())
    }
}
