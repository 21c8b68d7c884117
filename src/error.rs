use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Failures of a top-K run. Every variant aborts the whole pipeline; partial
/// results are never returned.
#[derive(Error, Debug)]
pub enum TopKError {
    #[error("failed to create partition storage: {source}")]
    StorageInit {
        #[source]
        source: io::Error,
    },

    #[error("failed to write partition {partition}: {source}")]
    PartitionWrite {
        partition: usize,
        #[source]
        source: io::Error,
    },

    #[error("failed to read partition {partition} ({}): {source}", path.display())]
    PartitionRead {
        partition: usize,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read input record: {0}")]
    Input(#[source] io::Error),

    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("run aborted by shutdown signal")]
    Aborted,

    #[error("failed to build reducer thread pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl TopKError {
    pub fn invalid_config(message: impl Into<String>) -> Self {
        TopKError::InvalidConfig {
            message: message.into(),
        }
    }
}

pub type Result<T, E = TopKError> = std::result::Result<T, E>;
