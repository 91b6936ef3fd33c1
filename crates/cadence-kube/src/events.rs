use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::{
    Client,
    runtime::events::{Event as KubeEvent, EventType, Recorder, Reporter},
};
use tracing::warn;

use cadence_core::event::EventSink;
use cadence_model::{Event, Severity};

/// Action recorded on every event emitted by the operator.
const EVENT_ACTION: &str = "Reboot";

/// Publishes operator events against the target node.
#[derive(Clone)]
pub struct KubeEvents {
    client: Client,
    reporter: Reporter,
}

impl KubeEvents {
    /// `component` becomes the event source (reporting controller).
    pub fn new(client: Client, component: impl Into<String>) -> Self {
        Self {
            client,
            reporter: Reporter {
                controller: component.into(),
                instance: None,
            },
        }
    }

    fn recorder(&self, node: &str) -> Recorder {
        Recorder::new(self.client.clone(), self.reporter.clone(), node_ref(node))
    }
}

/// Reference to a cluster-scoped node by name.
fn node_ref(name: &str) -> ObjectReference {
    ObjectReference {
        api_version: Some("v1".into()),
        kind: Some("Node".into()),
        name: Some(name.into()),
        ..Default::default()
    }
}

fn to_kube_event(event: Event) -> KubeEvent {
    KubeEvent {
        type_: match event.severity {
            Severity::Normal => EventType::Normal,
            Severity::Warning => EventType::Warning,
        },
        reason: event.reason,
        note: Some(event.message),
        action: EVENT_ACTION.into(),
        secondary: None,
    }
}

#[async_trait]
impl EventSink for KubeEvents {
    async fn emit(&self, event: Event) {
        let node = event.target.clone();
        if let Err(e) = self.recorder(&node).publish(to_kube_event(event)).await {
            warn!(node = %node, error = %e, "failed to publish event");
        }
    }
}
