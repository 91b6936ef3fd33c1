use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("unknown event severity: {0} (expected: normal|warning)")]
    UnknownSeverity(String),
}
