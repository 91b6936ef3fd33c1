//! Kubernetes adapters: cluster nodes as the fleet state store and
//! `events.k8s.io` as the event sink.
mod error;
pub use error::KubeError;

mod events;
pub use events::KubeEvents;

mod nodes;
pub use nodes::{KubeNodes, machine_from_node};

/// Maximum server-side watch timeout accepted by the API server.
pub const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

/// Attempts of one annotation write before giving up on conflicts.
pub const WRITE_ATTEMPTS: usize = 5;
