//! State store capability used by the operator.
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;

use cadence_model::{Annotations, Machine, MachineChange};

use crate::error::RepositoryError;

/// Live feed of changes to a watched machine.
///
/// The stream ends when the subscription's deadline passes or the store closes it.
pub type ChangeStream = BoxStream<'static, Result<MachineChange, RepositoryError>>;

/// Authoritative fleet state store.
///
/// Implementations are expected to be cheap to share (`Arc<dyn NodeRepository>`).
#[async_trait]
pub trait NodeRepository: Send + Sync {
    /// List all machines in the store's order.
    async fn list(&self) -> Result<Vec<Machine>, RepositoryError>;

    /// Subscribe to changes of the machine `name` that happened after `since_version`.
    ///
    /// The subscription ends on its own once `timeout` has elapsed.
    async fn watch(
        &self,
        name: &str,
        since_version: &str,
        timeout: Duration,
    ) -> Result<ChangeStream, RepositoryError>;

    /// Merge `annotations` into the machine's annotation set.
    ///
    /// The write is optimistic: it applies against the latest version known to the store
    /// and fails with [`RepositoryError::Conflict`] if it cannot be applied consistently.
    async fn set_annotations(
        &self,
        name: &str,
        annotations: &Annotations,
    ) -> Result<(), RepositoryError>;
}
