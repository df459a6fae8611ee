//! Map mutation algorithms
//!
//! Pure functions over a forest: the caller hands in a copy, and on error
//! the copy is discarded so the canonical document never sees a partial
//! mutation. Each mutating function returns the [`MapAction`] describing
//! what changed, for the audit log.

use crate::audit::MapAction;
use crate::error::MapError;
use crate::model::{EdgeFlag, Forest, MassStatus, Signature, System};
use crate::tree;

/// Insert a fully-enriched system into the forest.
///
/// The name must be unique across the entire forest; the duplicate check
/// runs before attachment regardless of where the new node would land.
/// With `src` the node becomes the last child of the named parent, without
/// it the node is appended as a new root.
pub fn add(forest: &mut Forest, system: System, src: Option<&str>) -> Result<MapAction, MapError> {
    if tree::contains(forest, &system.name) {
        return Err(MapError::DuplicateSystem);
    }
    let name = system.name.clone();
    match src {
        Some(src_name) => {
            let path = tree::find_system(forest, src_name).ok_or(MapError::SourceNotFound)?;
            let Some(parent) = tree::get_mut(forest, &path) else {
                return Err(MapError::SourceNotFound);
            };
            parent.connections.push(system);
            Ok(MapAction::Added {
                name,
                src: Some(src_name.to_string()),
            })
        }
        None => {
            forest.roots.push(system);
            Ok(MapAction::Added { name, src: None })
        }
    }
}

/// Remove the whole subtree rooted at the named node. A root match takes
/// priority over a deeper one.
pub fn delete(forest: &mut Forest, name: &str) -> Result<MapAction, MapError> {
    let path = match tree::find_root(forest, name) {
        Some(index) => vec![index],
        None => tree::find_system(forest, name).ok_or(MapError::SystemNotFound)?,
    };
    let removed = tree::remove(forest, &path).ok_or(MapError::SystemNotFound)?;
    let mut names = Vec::new();
    collect_names(&removed, &mut names);
    Ok(MapAction::Deleted { names })
}

fn collect_names(node: &System, names: &mut Vec<String>) {
    names.push(node.name.clone());
    for child in &node.connections {
        collect_names(child, names);
    }
}

/// Remove the named subtree from its parent and append it as a new root,
/// children intact. A node that is already a root cannot be detached.
pub fn detach(forest: &mut Forest, name: &str) -> Result<MapAction, MapError> {
    let path = tree::find_system(forest, name)
        .filter(|path| path.len() > 1)
        .ok_or(MapError::SystemNotFound)?;
    let node = tree::remove(forest, &path).ok_or(MapError::SystemNotFound)?;
    let name = node.name.clone();
    forest.roots.push(node);
    Ok(MapAction::Detached { name })
}

/// Flip or cycle an edge field on the child of the unique parent/child
/// pair matching `src`/`dest`. `reduced` and `critical` toggle against
/// `stable` and overwrite each other.
pub fn toggle_edge(
    forest: &mut Forest,
    src: &str,
    dest: &str,
    flag: EdgeFlag,
) -> Result<MapAction, MapError> {
    let path = tree::find_edge(forest, src, dest).ok_or(MapError::SystemNotFound)?;
    let Some(node) = tree::get_mut(forest, &path) else {
        return Err(MapError::SystemNotFound);
    };
    let name = node.name.clone();
    let action = match flag {
        EdgeFlag::Eol => {
            node.eol = !node.eol;
            MapAction::EolToggled { name, eol: node.eol }
        }
        EdgeFlag::Frigate => {
            node.frigate = !node.frigate;
            MapAction::FrigateToggled {
                name,
                frigate: node.frigate,
            }
        }
        EdgeFlag::Reduced => {
            node.mass = if node.mass == MassStatus::Reduced {
                MassStatus::Stable
            } else {
                MassStatus::Reduced
            };
            MapAction::MassChanged { name, mass: node.mass }
        }
        EdgeFlag::Critical => {
            node.mass = if node.mass == MassStatus::Critical {
                MassStatus::Stable
            } else {
                MassStatus::Critical
            };
            MapAction::MassChanged { name, mass: node.mass }
        }
    };
    Ok(action)
}

/// Merge a scanned signature batch into the named system.
///
/// Shared ids keep whichever side has the higher signal strength; an
/// incoming winner (ties included) inherits the old entry's note. Old
/// entries missing from the batch survive only in `add` mode. Leftover
/// incoming entries are appended with an empty note. Relative order is
/// surviving old entries first, then new ones.
pub fn update_signatures(
    forest: &mut Forest,
    system: &str,
    mode: &str,
    incoming: Vec<Signature>,
) -> Result<(), MapError> {
    let path = tree::find_system(forest, system).ok_or(MapError::SystemNotFound)?;
    let Some(node) = tree::get_mut(forest, &path) else {
        return Err(MapError::SystemNotFound);
    };
    let replace = match mode {
        "replace" => true,
        "add" => false,
        _ => return Err(MapError::InvalidAction),
    };

    // A paste can repeat an id; collapse to the last row so a node never
    // ends up holding two signatures with the same id.
    let mut incoming = {
        let mut deduped: Vec<Signature> = Vec::with_capacity(incoming.len());
        for sig in incoming {
            if let Some(pos) = deduped.iter().position(|s| s.id == sig.id) {
                deduped[pos] = sig;
            } else {
                deduped.push(sig);
            }
        }
        deduped
    };

    let old = std::mem::take(&mut node.signatures);
    let mut merged = Vec::with_capacity(old.len() + incoming.len());
    for sig in old {
        if let Some(pos) = incoming.iter().position(|s| s.id == sig.id) {
            let mut new = incoming.remove(pos);
            if new.signal_strength >= sig.signal_strength {
                new.note = sig.note;
                merged.push(new);
            } else {
                merged.push(sig);
            }
        } else if !replace {
            merged.push(sig);
        }
    }
    for mut sig in incoming {
        sig.note = String::new();
        merged.push(sig);
    }
    node.signatures = merged;
    Ok(())
}

/// Delete one signature by id, or clear the whole list when `id` is None.
pub fn delete_signature(
    forest: &mut Forest,
    system: &str,
    id: Option<&str>,
) -> Result<(), MapError> {
    let path = tree::find_system(forest, system).ok_or(MapError::SystemNotFound)?;
    let Some(node) = tree::get_mut(forest, &path) else {
        return Err(MapError::SystemNotFound);
    };
    match id {
        None => node.signatures.clear(),
        Some(id) => {
            let pos = node
                .signatures
                .iter()
                .position(|sig| sig.id == id)
                .ok_or(MapError::SignatureNotFound)?;
            node.signatures.remove(pos);
        }
    }
    Ok(())
}

/// Update the note on a signature. An unknown id is a silent no-op.
pub fn set_signature_note(
    forest: &mut Forest,
    system: &str,
    id: &str,
    note: &str,
) -> Result<(), MapError> {
    let path = tree::find_system(forest, system).ok_or(MapError::SystemNotFound)?;
    let Some(node) = tree::get_mut(forest, &path) else {
        return Err(MapError::SystemNotFound);
    };
    if let Some(sig) = node.signatures.iter_mut().find(|sig| sig.id == id) {
        sig.note = note.to_string();
    }
    Ok(())
}
