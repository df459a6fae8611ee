//! Audit log entries and message formatting
//!
//! Every committed mutation appends human-readable entries; a cascading
//! delete writes one entry per removed node. Failed commands leave no trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::MassStatus;

/// What a committed mutation did, used to compose audit messages.
#[derive(Debug, Clone, PartialEq)]
pub enum MapAction {
    Added { name: String, src: Option<String> },
    /// Removed node names, pre-order: the target first, then descendants.
    Deleted { names: Vec<String> },
    Detached { name: String },
    EolToggled { name: String, eol: bool },
    FrigateToggled { name: String, frigate: bool },
    MassChanged { name: String, mass: MassStatus },
    UserCreated { username: String },
}

impl MapAction {
    /// One message per audit entry to write.
    pub fn messages(&self) -> Vec<String> {
        match self {
            MapAction::Added { name, src: None } => {
                vec![format!("added new root system {name}")]
            }
            MapAction::Added { name, src: Some(src) } => {
                vec![format!("added system {name} connected to {src}")]
            }
            MapAction::Deleted { names } => names
                .iter()
                .map(|name| format!("deleted system {name}"))
                .collect(),
            MapAction::Detached { name } => vec![format!("detached system {name}")],
            MapAction::EolToggled { name, eol: true } => vec![format!("set {name} to EoL")],
            MapAction::EolToggled { name, eol: false } => {
                vec![format!("reverted {name} to not EoL")]
            }
            MapAction::FrigateToggled { name, frigate: true } => {
                vec![format!("set {name} as frigate only")]
            }
            MapAction::FrigateToggled { name, frigate: false } => {
                vec![format!("set {name} as not frigate only")]
            }
            MapAction::MassChanged { name, mass: MassStatus::Stable } => {
                vec![format!("reverted {name} to stable")]
            }
            MapAction::MassChanged { name, mass } => vec![format!("set {name} to {mass}")],
            MapAction::UserCreated { username } => vec![format!("created user {username}")],
        }
    }
}

/// One appended audit record. Iteration over the log is newest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub time: DateTime<Utc>,
    pub actor: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_messages() {
        let root = MapAction::Added {
            name: "Jita".to_string(),
            src: None,
        };
        assert_eq!(root.messages(), vec!["added new root system Jita"]);

        let child = MapAction::Added {
            name: "J164522".to_string(),
            src: Some("Jita".to_string()),
        };
        assert_eq!(
            child.messages(),
            vec!["added system J164522 connected to Jita"]
        );
    }

    #[test]
    fn delete_cascade_writes_one_message_per_node() {
        let action = MapAction::Deleted {
            names: vec!["A".to_string(), "B".to_string(), "C".to_string()],
        };
        assert_eq!(
            action.messages(),
            vec![
                "deleted system A",
                "deleted system B",
                "deleted system C"
            ]
        );
    }

    #[test]
    fn toggle_messages() {
        let set = MapAction::EolToggled {
            name: "J164522".to_string(),
            eol: true,
        };
        assert_eq!(set.messages(), vec!["set J164522 to EoL"]);

        let reverted = MapAction::MassChanged {
            name: "J164522".to_string(),
            mass: MassStatus::Stable,
        };
        assert_eq!(reverted.messages(), vec!["reverted J164522 to stable"]);

        let critical = MapAction::MassChanged {
            name: "J164522".to_string(),
            mass: MassStatus::Critical,
        };
        assert_eq!(critical.messages(), vec!["set J164522 to critical"]);
    }
}
