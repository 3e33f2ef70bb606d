use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while reading snapshots or deriving fields from them.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to open snapshot '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("unexpected end of file while reading {0}")]
    UnexpectedEof(String),

    #[error("malformed VTK data: {0}")]
    Format(String),

    #[error("shape mismatch: {0}")]
    Shape(String),

    #[error("field '{0}' not found in snapshot")]
    MissingField(String),
}

impl SnapshotError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        SnapshotError::Format(msg.into())
    }

    pub(crate) fn shape(msg: impl Into<String>) -> Self {
        SnapshotError::Shape(msg.into())
    }

    /// True for errors caused by the content of the snapshot rather than by I/O.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            SnapshotError::Format(_) | SnapshotError::Shape(_) | SnapshotError::MissingField(_)
        )
    }
}

/// Errors raised while loading a plot configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML from '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
