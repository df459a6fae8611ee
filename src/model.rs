//! Map document types
//!
//! The map is a forest: an ordered sequence of root systems, each owning an
//! ordered sequence of child connections. Order is insertion order and is
//! meaningful — it is preserved across saves and determines first-match
//! semantics in searches. The snapshot wire format is the serde_json
//! rendering of [`Forest`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The full map document: an ordered sequence of independent root trees.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Forest {
    pub roots: Vec<System>,
}

impl Forest {
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Mass status of a connection. `reduced` and `critical` each toggle
/// against `stable` and overwrite each other; there is no 3-way cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MassStatus {
    #[default]
    Stable,
    Reduced,
    Critical,
}

impl fmt::Display for MassStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MassStatus::Stable => write!(f, "stable"),
            MassStatus::Reduced => write!(f, "reduced"),
            MassStatus::Critical => write!(f, "critical"),
        }
    }
}

/// Toggleable per-edge fields. Conceptually these live on the parent→child
/// edge, but each node has exactly one parent edge so they are stored on
/// the child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeFlag {
    Eol,
    Frigate,
    Reduced,
    Critical,
}

/// A resolved static wormhole link carried by wormhole-class systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WormholeStatic {
    pub name: String,
    pub dest: String,
    pub lifetime: u32,
    pub jump_mass: u64,
    pub max_mass: u64,
}

/// One hop of a computed route to a trade hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    pub name: String,
    pub security: f64,
}

/// A scannable signature recorded against a system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signature {
    /// Short scan code, unique within its owning system.
    pub id: String,
    pub scan_group: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Scan strength in percent, 0-100.
    pub signal_strength: f64,
    pub distance: String,
    #[serde(default)]
    pub note: String,
}

/// A named location in the map. Wormhole-class systems carry static
/// wormhole links; known-space systems carry computed hub routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct System {
    /// Globally unique across the entire forest. This is the central
    /// invariant; violating it is a hard error on add.
    pub name: String,
    pub region: String,
    pub class: String,

    /// Wormhole-only system-wide effect.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static1: Option<WormholeStatic>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static2: Option<WormholeStatic>,

    /// Hub name → route hops. Known-space only; fetched once at add time
    /// and never refreshed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jumps: Option<BTreeMap<String, Vec<Hop>>>,

    #[serde(default)]
    pub mass: MassStatus,
    #[serde(default)]
    pub eol: bool,
    #[serde(default)]
    pub frigate: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signatures: Vec<Signature>,

    /// Owned children. A system is owned by exactly one parent, or is a root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub connections: Vec<System>,
}

impl System {
    pub fn new(name: impl Into<String>, region: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            region: region.into(),
            class: class.into(),
            effect: None,
            static1: None,
            static2: None,
            jumps: None,
            mass: MassStatus::Stable,
            eol: false,
            frigate: false,
            signatures: Vec::new(),
            connections: Vec::new(),
        }
    }
}

/// An `ADD` command payload: the location to add and the optional parent
/// to attach it under. No `src` means the new system becomes a root.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddRequest {
    pub dest: String,
    #[serde(default)]
    pub src: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_forest() -> Forest {
        let mut root = System::new("Jita", "The Forge", "highsec");
        root.jumps = Some(BTreeMap::from([(
            "Amarr".to_string(),
            vec![Hop {
                name: "Perimeter".to_string(),
                security: 0.9,
            }],
        )]));
        let mut child = System::new("J164522", "D-R00018", "C4");
        child.effect = Some("Cataclysmic Variable".to_string());
        child.static1 = Some(WormholeStatic {
            name: "X877".to_string(),
            dest: "C4".to_string(),
            lifetime: 16,
            jump_mass: 300_000_000,
            max_mass: 2_000_000_000,
        });
        child.eol = true;
        child.mass = MassStatus::Critical;
        child.signatures.push(Signature {
            id: "ABC-123".to_string(),
            scan_group: "Signature".to_string(),
            kind: "Wormhole".to_string(),
            signal_strength: 42.5,
            distance: "3.1 AU".to_string(),
            note: "home hole".to_string(),
        });
        root.connections.push(child);
        Forest { roots: vec![root] }
    }

    #[test]
    fn snapshot_round_trip() {
        let forest = sample_forest();
        let json = serde_json::to_string(&forest).unwrap();
        let restored: Forest = serde_json::from_str(&json).unwrap();
        assert_eq!(forest, restored);
    }

    #[test]
    fn snapshot_is_a_json_array() {
        let json = serde_json::to_string(&sample_forest()).unwrap();
        assert!(json.starts_with('['));
        // Absent optional fields stay off the wire.
        assert!(!json.contains("\"effect\":null"));
        assert!(json.contains("\"mass\":\"critical\""));
        assert!(json.contains("\"type\":\"Wormhole\""));
    }

    #[test]
    fn defaults_fill_in_on_load() {
        let json = r#"[{"name":"Jita","region":"The Forge","class":"highsec"}]"#;
        let forest: Forest = serde_json::from_str(json).unwrap();
        let root = &forest.roots[0];
        assert_eq!(root.mass, MassStatus::Stable);
        assert!(!root.eol);
        assert!(!root.frigate);
        assert!(root.signatures.is_empty());
        assert!(root.connections.is_empty());
    }

    #[test]
    fn add_request_optional_src() {
        let req: AddRequest = serde_json::from_str(r#"{"dest":"Jita"}"#).unwrap();
        assert_eq!(req.dest, "Jita");
        assert!(req.src.is_none());

        let req: AddRequest =
            serde_json::from_str(r#"{"dest":"J164522","src":"Jita"}"#).unwrap();
        assert_eq!(
            req,
            AddRequest {
                dest: "J164522".to_string(),
                src: Some("Jita".to_string()),
            }
        );
    }
}
