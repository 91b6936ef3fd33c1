//! In-memory fleet state store and event recorder.
//!
//! Mirrors the semantics the operator relies on from a real store:
//! - a global, monotonically increasing version bumped by every write;
//! - a change history, so a watch opened "since version V" replays what happened after V;
//! - watches scoped to one machine that end at their deadline;
//! - a bounded history: a watch starting before the retained window fails, like an
//!   expired resource version.
//!
//! Failures can be injected per operation for testing the operator's recovery paths.
use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use async_trait::async_trait;
use futures::{StreamExt, stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{Instant, timeout_at};
use tracing::trace;

use cadence_model::{Annotations, Event, Machine, MachineChange};

use crate::{
    error::RepositoryError,
    event::EventSink,
    repository::{ChangeStream, NodeRepository},
};

/// Buffered changes per live watcher before it starts lagging.
const WATCH_CHANNEL_CAPACITY: usize = 256;

/// Changes kept for replaying to watches that start in the past.
pub const HISTORY_CAPACITY: usize = 1024;

/// One annotation write issued through [`NodeRepository::set_annotations`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationWrite {
    pub name: String,
    pub annotations: Annotations,
}

struct FleetState {
    version: u64,
    machines: Vec<Machine>,
    history: VecDeque<(u64, MachineChange)>,
    /// Highest version dropped from `history`.
    compacted: u64,
    writes: Vec<AnnotationWrite>,
    list_failures: usize,
    failing_writes: HashSet<String>,
    fail_watches: bool,
}

impl FleetState {
    fn bump(&mut self) -> u64 {
        self.version += 1;
        self.version
    }
}

/// What live watchers receive.
#[derive(Clone)]
enum Feed {
    Change(MachineChange),
    Fault(String),
}

/// Versioned in-memory [`NodeRepository`].
///
/// Cloning yields another handle to the same fleet.
#[derive(Clone)]
pub struct MemoryFleet {
    state: Arc<Mutex<FleetState>>,
    changes: broadcast::Sender<Feed>,
}

impl Default for MemoryFleet {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFleet {
    /// Create an empty fleet.
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(WATCH_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(FleetState {
                version: 0,
                machines: Vec::new(),
                history: VecDeque::new(),
                compacted: 0,
                writes: Vec::new(),
                list_failures: 0,
                failing_writes: HashSet::new(),
                fail_watches: false,
            })),
            changes,
        }
    }

    fn lock(&self) -> MutexGuard<'_, FleetState> {
        // A panicking test thread must not hide the fleet from the others.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a machine, or replace its annotations if it already exists.
    ///
    /// New machines are listed after existing ones.
    pub fn insert(&self, name: &str, annotations: Annotations) -> Machine {
        let mut st = self.lock();
        let version = st.bump();
        let machine = Machine::new(name, version.to_string(), annotations);

        match st.machines.iter_mut().find(|m| m.name == name) {
            Some(slot) => *slot = machine.clone(),
            None => st.machines.push(machine.clone()),
        }
        self.record(&mut st, version, MachineChange::Applied(machine.clone()));
        machine
    }

    /// Merge annotations the way the remote agent would.
    ///
    /// Unlike [`NodeRepository::set_annotations`] this is not recorded in [`MemoryFleet::writes`]
    /// and ignores injected write failures.
    pub fn apply(&self, name: &str, annotations: &Annotations) -> Option<Machine> {
        let mut st = self.lock();
        self.merge_locked(&mut st, name, annotations)
    }

    /// Remove a machine from the fleet.
    pub fn remove(&self, name: &str) -> Option<Machine> {
        let mut st = self.lock();
        let idx = st.machines.iter().position(|m| m.name == name)?;
        let removed = st.machines.remove(idx);
        let version = st.bump();
        self.record(&mut st, version, MachineChange::Deleted(removed.clone()));
        Some(removed)
    }

    /// Current snapshot of one machine.
    pub fn get(&self, name: &str) -> Option<Machine> {
        self.lock().machines.iter().find(|m| m.name == name).cloned()
    }

    /// All writes issued through the repository interface, in order.
    pub fn writes(&self) -> Vec<AnnotationWrite> {
        self.lock().writes.clone()
    }

    /// Writes issued for one machine.
    pub fn writes_for(&self, name: &str) -> Vec<Annotations> {
        self.lock()
            .writes
            .iter()
            .filter(|w| w.name == name)
            .map(|w| w.annotations.clone())
            .collect()
    }

    /// Make the next `n` list calls fail.
    pub fn fail_next_lists(&self, n: usize) {
        self.lock().list_failures = n;
    }

    /// Make every write to `name` fail.
    pub fn fail_writes_for(&self, name: &str) {
        self.lock().failing_writes.insert(name.to_string());
    }

    /// Make every watch call fail (or succeed again).
    pub fn fail_watches(&self, fail: bool) {
        self.lock().fail_watches = fail;
    }

    /// Make every open watch yield `reason` as an error.
    ///
    /// Watches opened afterwards are unaffected.
    pub fn break_watches(&self, reason: &str) {
        let _ = self.changes.send(Feed::Fault(reason.to_string()));
    }

    fn merge_locked(
        &self,
        st: &mut FleetState,
        name: &str,
        annotations: &Annotations,
    ) -> Option<Machine> {
        let idx = st.machines.iter().position(|m| m.name == name)?;
        let version = st.bump();

        let machine = &mut st.machines[idx];
        machine.annotations.merge(annotations);
        machine.version = version.to_string();
        let snapshot = machine.clone();

        self.record(st, version, MachineChange::Applied(snapshot.clone()));
        Some(snapshot)
    }

    fn record(&self, st: &mut FleetState, version: u64, change: MachineChange) {
        trace!(version, node = %change.machine().name, "memory fleet change");
        if st.history.len() == HISTORY_CAPACITY {
            if let Some((dropped, _)) = st.history.pop_front() {
                st.compacted = dropped;
            }
        }
        st.history.push_back((version, change.clone()));
        // No receivers simply means nobody is watching.
        let _ = self.changes.send(Feed::Change(change));
    }
}

#[async_trait]
impl NodeRepository for MemoryFleet {
    async fn list(&self) -> Result<Vec<Machine>, RepositoryError> {
        let mut st = self.lock();
        if st.list_failures > 0 {
            st.list_failures -= 1;
            return Err(RepositoryError::List("injected list failure".into()));
        }
        Ok(st.machines.clone())
    }

    async fn watch(
        &self,
        name: &str,
        since_version: &str,
        timeout: Duration,
    ) -> Result<ChangeStream, RepositoryError> {
        let since: u64 = since_version
            .parse()
            .map_err(|_| RepositoryError::Watch(format!("invalid version {since_version:?}")))?;

        // Replay and subscribe under one lock so no change falls in between.
        let (replay, rx) = {
            let st = self.lock();
            if st.fail_watches {
                return Err(RepositoryError::Watch("injected watch failure".into()));
            }
            if since < st.compacted {
                return Err(RepositoryError::Watch(format!(
                    "version {since} is older than the retained history ({})",
                    st.compacted
                )));
            }
            let replay: Vec<Result<MachineChange, RepositoryError>> = st
                .history
                .iter()
                .filter(|(v, c)| *v > since && c.machine().name == name)
                .map(|(_, c)| Ok(c.clone()))
                .collect();
            (replay, self.changes.subscribe())
        };

        let deadline = Instant::now() + timeout;
        let name = name.to_string();
        let live = stream::unfold((rx, name, deadline), |(mut rx, name, deadline)| async move {
            loop {
                match timeout_at(deadline, rx.recv()).await {
                    Err(_) => return None,
                    Ok(Err(RecvError::Closed)) => return None,
                    Ok(Err(RecvError::Lagged(_))) => continue,
                    Ok(Ok(Feed::Change(change))) if change.machine().name == name => {
                        return Some((Ok(change), (rx, name, deadline)));
                    }
                    Ok(Ok(Feed::Change(_))) => continue,
                    Ok(Ok(Feed::Fault(reason))) => {
                        return Some((Err(RepositoryError::Watch(reason)), (rx, name, deadline)));
                    }
                }
            }
        });

        Ok(stream::iter(replay).chain(live).boxed())
    }

    async fn set_annotations(
        &self,
        name: &str,
        annotations: &Annotations,
    ) -> Result<(), RepositoryError> {
        let mut st = self.lock();
        if st.failing_writes.contains(name) {
            return Err(RepositoryError::Write(format!(
                "injected write failure for {name}"
            )));
        }
        st.writes.push(AnnotationWrite {
            name: name.to_string(),
            annotations: annotations.clone(),
        });
        self.merge_locked(&mut st, name, annotations)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(name.to_string()))
    }
}

/// [`EventSink`] that keeps every emitted event in memory.
#[derive(Clone, Default)]
pub struct MemoryEvents {
    events: Arc<Mutex<Vec<Event>>>,
}

impl MemoryEvents {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events emitted so far, in order.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl EventSink for MemoryEvents {
    async fn emit(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}
