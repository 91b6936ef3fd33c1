use serde::{Deserialize, Serialize};

use crate::domain::{Annotations, RebootState, Version};

/// Snapshot of one fleet member as returned by the state store.
///
/// The operator never creates or deletes machines; it only reads snapshots
/// and patches their annotations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    /// Stable identifier (node name).
    pub name: String,
    /// Version token of this snapshot.
    pub version: Version,
    /// Annotation set at this version.
    #[serde(default)]
    pub annotations: Annotations,
}

impl Machine {
    /// Create a snapshot.
    pub fn new(name: impl Into<String>, version: impl Into<Version>, annotations: Annotations) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            annotations,
        }
    }

    /// Typed view of the reboot coordination annotations.
    pub fn reboot_state(&self) -> RebootState {
        self.annotations.reboot_state()
    }
}

/// One observed change of a watched machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MachineChange {
    /// The machine was added or modified; carries the new snapshot.
    Applied(Machine),
    /// The machine was removed from the store; carries the last known snapshot.
    Deleted(Machine),
}

impl MachineChange {
    /// Snapshot carried by the change.
    pub fn machine(&self) -> &Machine {
        match self {
            MachineChange::Applied(m) | MachineChange::Deleted(m) => m,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_camel_case_and_defaults_annotations() {
        let m: Machine = serde_json::from_str(r#"{"name":"n1","version":"7"}"#).unwrap();
        assert_eq!(m.name, "n1");
        assert_eq!(m.version, "7");
        assert!(m.annotations.is_empty());
    }

    #[test]
    fn change_exposes_snapshot() {
        let m = Machine::new("n1", "1", Annotations::new());
        assert_eq!(MachineChange::Deleted(m.clone()).machine(), &m);
        assert_eq!(MachineChange::Applied(m.clone()).machine(), &m);
    }
}
