use thiserror::Error;

use cadence_core::error::RepositoryError;

/// Failure of a call against the Kubernetes API.
#[derive(Debug, Error)]
pub enum KubeError {
    #[error("node '{0}' not found")]
    NotFound(String),

    #[error("node '{0}' was modified concurrently")]
    Conflict(String),

    #[error("node has no name")]
    Unnamed,

    #[error("api error {code}: {message}")]
    Api { code: u16, message: String },

    #[error(transparent)]
    Client(kube::Error),
}

impl KubeError {
    /// Classify a client error for the node `name`.
    pub fn from_client(name: &str, e: kube::Error) -> Self {
        match e {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound(name.to_string()),
            kube::Error::Api(resp) if resp.code == 409 => Self::Conflict(name.to_string()),
            kube::Error::Api(resp) => Self::Api {
                code: resp.code,
                message: resp.message,
            },
            other => Self::Client(other),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    pub fn into_list(self) -> RepositoryError {
        RepositoryError::List(self.to_string())
    }

    pub fn into_watch(self) -> RepositoryError {
        RepositoryError::Watch(self.to_string())
    }

    pub fn into_write(self) -> RepositoryError {
        match self {
            Self::NotFound(name) => RepositoryError::NotFound(name),
            Self::Conflict(name) => RepositoryError::Conflict(name),
            other => RepositoryError::Write(other.to_string()),
        }
    }
}
