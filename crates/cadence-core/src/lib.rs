pub mod config;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod event;
pub mod memory;
pub mod metrics;
pub mod operator;
pub mod ratelimit;
pub mod repository;
pub mod selector;

pub use context::OperatorContext;

pub mod prelude {
    pub use crate::config::{OperatorConfig, RateLimitConfig};
    pub use crate::context::OperatorContext;
    pub use crate::coordinator::{AbortReason, CoordinationOutcome, Coordinator};
    pub use crate::error::{CoreError, RepositoryError};
    pub use crate::event::{EventSink, LogSink};
    pub use crate::metrics::{MetricsBackend, MetricsHandle, NoOpMetrics};
    pub use crate::operator::{IterationReport, Operator, SkipReason};
    pub use crate::ratelimit::TokenBucket;
    pub use crate::repository::{ChangeStream, NodeRepository};
    pub use crate::selector::Selector;
}
