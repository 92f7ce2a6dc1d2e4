//! Error types for Roller

use std::io;
use std::path::PathBuf;

/// Roller error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Config error: {0}")]
    ConfigError(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("write length {len}, max size {max}: write exceeds max file length")]
    WriteTooLong { len: u64, max: u64 },

    #[error("Roller is closed")]
    Closed,

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

/// Result type alias for Roller
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Error::ConfigError(msg.into())
    }

    /// Wrap an I/O error with the step that failed
    pub fn io<S: Into<String>>(context: S, source: io::Error) -> Self {
        Error::Io {
            context: context.into(),
            source,
        }
    }

    /// The underlying I/O error kind, if this error came from the filesystem
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io { source, .. } => Some(source.kind()),
            Error::IoError(e) => Some(e.kind()),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::IoError(e) => e,
            other => {
                let kind = match &other {
                    Error::Io { source, .. } => source.kind(),
                    Error::WriteTooLong { .. } | Error::ConfigError(_) => {
                        io::ErrorKind::InvalidInput
                    }
                    Error::Closed => io::ErrorKind::BrokenPipe,
                    Error::ConfigNotFound(_) => io::ErrorKind::NotFound,
                    _ => io::ErrorKind::Other,
                };
                io::Error::new(kind, other)
            }
        }
    }
}
