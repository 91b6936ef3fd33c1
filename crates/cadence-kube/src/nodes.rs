use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use k8s_openapi::api::core::v1::Node;
use kube::{
    Api, Client,
    api::{ListParams, PostParams, WatchEvent, WatchParams},
};
use tracing::{debug, trace};

use cadence_core::{
    error::RepositoryError,
    repository::{ChangeStream, NodeRepository},
};
use cadence_model::{Annotations, Machine, MachineChange};

use crate::{MAX_WATCH_TIMEOUT_SECS, WRITE_ATTEMPTS, error::KubeError};

/// Cluster nodes as the fleet state store.
#[derive(Clone)]
pub struct KubeNodes {
    api: Api<Node>,
}

impl KubeNodes {
    pub fn new(client: Client) -> Self {
        Self {
            api: Api::all(client),
        }
    }

    async fn try_merge(&self, name: &str, annotations: &Annotations) -> Result<(), KubeError> {
        let mut node = self
            .api
            .get(name)
            .await
            .map_err(|e| KubeError::from_client(name, e))?;

        let current = node.metadata.annotations.get_or_insert_with(Default::default);
        for (k, v) in annotations.iter() {
            current.insert(k.to_string(), v.to_string());
        }

        // The fetched resourceVersion travels with the object, so a concurrent
        // update turns this into a 409.
        self.api
            .replace(name, &PostParams::default(), &node)
            .await
            .map(|_| ())
            .map_err(|e| KubeError::from_client(name, e))
    }
}

/// Snapshot of a node as seen by the operator.
pub fn machine_from_node(node: Node) -> Result<Machine, KubeError> {
    let meta = node.metadata;
    let name = meta.name.ok_or(KubeError::Unnamed)?;

    Ok(Machine::new(
        name,
        meta.resource_version.unwrap_or_default(),
        Annotations::from(meta.annotations.unwrap_or_default()),
    ))
}

fn change_from_event(event: WatchEvent<Node>) -> Option<Result<MachineChange, RepositoryError>> {
    let convert = |node: Node| machine_from_node(node).map_err(KubeError::into_watch);
    match event {
        WatchEvent::Added(node) | WatchEvent::Modified(node) => {
            Some(convert(node).map(MachineChange::Applied))
        }
        WatchEvent::Deleted(node) => Some(convert(node).map(MachineChange::Deleted)),
        WatchEvent::Bookmark(_) => None,
        WatchEvent::Error(resp) => Some(Err(KubeError::Api {
            code: resp.code,
            message: resp.message,
        }
        .into_watch())),
    }
}

/// Server-side timeout for one watch request, in seconds.
fn watch_timeout_secs(timeout: Duration) -> u32 {
    let secs = timeout.as_secs().max(1);
    u32::try_from(secs)
        .unwrap_or(MAX_WATCH_TIMEOUT_SECS)
        .min(MAX_WATCH_TIMEOUT_SECS)
}

#[async_trait]
impl NodeRepository for KubeNodes {
    async fn list(&self) -> Result<Vec<Machine>, RepositoryError> {
        let nodes = self
            .api
            .list(&ListParams::default())
            .await
            .map_err(|e| KubeError::Client(e).into_list())?;

        nodes
            .items
            .into_iter()
            .map(|n| machine_from_node(n).map_err(KubeError::into_list))
            .collect()
    }

    async fn watch(
        &self,
        name: &str,
        since_version: &str,
        timeout: Duration,
    ) -> Result<ChangeStream, RepositoryError> {
        let params = WatchParams::default()
            .fields(&format!("metadata.name={name}"))
            .timeout(watch_timeout_secs(timeout));
        debug!(node = %name, version = %since_version, "watching node");

        let events = self
            .api
            .watch(&params, since_version)
            .await
            .map_err(|e| KubeError::from_client(name, e).into_watch())?
            .filter_map(|item| async move {
                match item {
                    Ok(event) => change_from_event(event),
                    Err(e) => Some(Err(KubeError::Client(e).into_watch())),
                }
            });

        Ok(events.boxed())
    }

    async fn set_annotations(
        &self,
        name: &str,
        annotations: &Annotations,
    ) -> Result<(), RepositoryError> {
        let mut attempt = 1;
        loop {
            match self.try_merge(name, annotations).await {
                Ok(()) => return Ok(()),
                Err(e) if e.is_conflict() && attempt < WRITE_ATTEMPTS => {
                    trace!(node = %name, attempt, "annotation write conflicted; retrying");
                    attempt += 1;
                }
                Err(e) => return Err(e.into_write()),
            }
        }
    }
}
