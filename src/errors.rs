//! # Application Error Handling

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    /// An unknown backend kind was requested. Fatal, never retried.
    #[error("unsupported storage backend: '{0}'")]
    UnsupportedBackend(String),

    /// Every attempted destination failed. The one condition the orchestrator
    /// treats as a hard failure of the overall write.
    #[error("all {attempted} replica writes failed")]
    AllReplicasFailed { attempted: usize },

    #[error("timed out acquiring lock for key: '{0}'")]
    LockTimeout(String),

    #[error("replica pool is shut down")]
    PoolClosed,

    #[error(transparent)]
    Storage(#[from] crate::storage::StorageError),

    #[error(transparent)]
    JSON(#[from] serde_json::Error),

    #[error(transparent)]
    YAML(#[from] serde_yaml::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    Any(#[from] Box<dyn std::error::Error + Send + Sync>),
}
