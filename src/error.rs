use thiserror::Error;

/// Result type alias for crate-level operations
pub type Result<T> = std::result::Result<T, Error>;

/// A single environment query that could not be answered.
///
/// Probes never propagate this: the affected probe reports CLEAN and keeps
/// the error in its observation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The facility does not exist on this platform
    #[error("{0} is not available on this platform")]
    Unsupported(&'static str),

    /// The OS call failed with a raw error code
    #[error("{facility} failed with OS error {code}")]
    Os {
        facility: &'static str,
        code: u32,
    },

    /// Reading a pseudo-file or similar source failed
    #[error("{facility}: {message}")]
    Io {
        facility: &'static str,
        message: String,
    },

    /// The facility answered with something that could not be interpreted
    #[error("{facility} returned malformed data: {detail}")]
    Malformed {
        facility: &'static str,
        detail: String,
    },
}

impl QueryError {
    pub fn io(facility: &'static str, err: std::io::Error) -> Self {
        QueryError::Io {
            facility,
            message: err.to_string(),
        }
    }
}

/// Errors outside the probe path
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed reading config file {path}: {source}")]
    ConfigRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("invalid config value: {0}")]
    ConfigInvalid(String),
}
