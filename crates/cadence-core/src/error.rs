use thiserror::Error;

/// Failure of a call against the fleet state store.
///
/// Every variant is recoverable from the operator's point of view:
/// the next iteration re-lists and re-derives ground truth.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("list failed: {0}")]
    List(String),

    #[error("watch failed: {0}")]
    Watch(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("machine not found: {0}")]
    NotFound(String),

    #[error("write conflict on machine '{0}'")]
    Conflict(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
