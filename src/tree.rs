//! Read-only locate primitives over the forest
//!
//! Locating and mutating are kept separate: searches return an owning index
//! path into the forest rather than a live reference, and callers apply
//! changes at that path afterwards. All traversals are pre-order (node
//! before its children), scanning roots in order and children in order.
//! Name uniqueness means at most one match can exist for name searches.

use crate::model::{Forest, System};

/// Index path from a root into the forest. The first element indexes the
/// root, each following element indexes into `connections`.
pub type NodePath = Vec<usize>;

/// Find the first node satisfying `pred`, pre-order.
pub fn find<P>(forest: &Forest, pred: P) -> Option<NodePath>
where
    P: Fn(&System) -> bool,
{
    for (i, root) in forest.roots.iter().enumerate() {
        let mut path = vec![i];
        if find_in(root, &pred, &mut path) {
            return Some(path);
        }
    }
    None
}

fn find_in<P>(node: &System, pred: &P, path: &mut NodePath) -> bool
where
    P: Fn(&System) -> bool,
{
    if pred(node) {
        return true;
    }
    for (i, child) in node.connections.iter().enumerate() {
        path.push(i);
        if find_in(child, pred, path) {
            return true;
        }
        path.pop();
    }
    false
}

/// Find a node anywhere in the forest by name.
pub fn find_system(forest: &Forest, name: &str) -> Option<NodePath> {
    find(forest, |node| node.name == name)
}

/// Find a root by name. Root matches take priority for delete.
pub fn find_root(forest: &Forest, name: &str) -> Option<usize> {
    forest.roots.iter().position(|root| root.name == name)
}

/// Find the parent/child pair where the parent is named `src` and a direct
/// child is named `dest`. Returns the path to the child.
pub fn find_edge(forest: &Forest, src: &str, dest: &str) -> Option<NodePath> {
    for (i, root) in forest.roots.iter().enumerate() {
        let mut path = vec![i];
        if find_edge_in(root, src, dest, &mut path) {
            return Some(path);
        }
    }
    None
}

fn find_edge_in(node: &System, src: &str, dest: &str, path: &mut NodePath) -> bool {
    for (i, child) in node.connections.iter().enumerate() {
        path.push(i);
        if node.name == src && child.name == dest {
            return true;
        }
        if find_edge_in(child, src, dest, path) {
            return true;
        }
        path.pop();
    }
    false
}

pub fn contains(forest: &Forest, name: &str) -> bool {
    find_system(forest, name).is_some()
}

/// Resolve a path to a node.
pub fn get<'a>(forest: &'a Forest, path: &[usize]) -> Option<&'a System> {
    let (&first, rest) = path.split_first()?;
    let mut node = forest.roots.get(first)?;
    for &index in rest {
        node = node.connections.get(index)?;
    }
    Some(node)
}

/// Resolve a path to a mutable node.
pub fn get_mut<'a>(forest: &'a mut Forest, path: &[usize]) -> Option<&'a mut System> {
    let (&first, rest) = path.split_first()?;
    let mut node = forest.roots.get_mut(first)?;
    for &index in rest {
        node = node.connections.get_mut(index)?;
    }
    Some(node)
}

/// Remove and return the subtree at `path`, children intact.
pub fn remove(forest: &mut Forest, path: &[usize]) -> Option<System> {
    let (&last, parents) = path.split_last()?;
    if parents.is_empty() {
        if last < forest.roots.len() {
            Some(forest.roots.remove(last))
        } else {
            None
        }
    } else {
        let parent = get_mut(forest, parents)?;
        if last < parent.connections.len() {
            Some(parent.connections.remove(last))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::System;

    /// Jita ── Perimeter ── J164522
    /// Amarr
    fn sample() -> Forest {
        let mut jita = System::new("Jita", "The Forge", "highsec");
        let mut perimeter = System::new("Perimeter", "The Forge", "highsec");
        perimeter
            .connections
            .push(System::new("J164522", "D-R00018", "C4"));
        jita.connections.push(perimeter);
        Forest {
            roots: vec![jita, System::new("Amarr", "Domain", "highsec")],
        }
    }

    #[test]
    fn find_returns_index_paths() {
        let forest = sample();
        assert_eq!(find_system(&forest, "Jita"), Some(vec![0]));
        assert_eq!(find_system(&forest, "Perimeter"), Some(vec![0, 0]));
        assert_eq!(find_system(&forest, "J164522"), Some(vec![0, 0, 0]));
        assert_eq!(find_system(&forest, "Amarr"), Some(vec![1]));
        assert_eq!(find_system(&forest, "Rens"), None);
    }

    #[test]
    fn find_root_only_matches_roots() {
        let forest = sample();
        assert_eq!(find_root(&forest, "Amarr"), Some(1));
        assert_eq!(find_root(&forest, "Perimeter"), None);
    }

    #[test]
    fn find_edge_matches_parent_and_child() {
        let forest = sample();
        assert_eq!(find_edge(&forest, "Jita", "Perimeter"), Some(vec![0, 0]));
        assert_eq!(
            find_edge(&forest, "Perimeter", "J164522"),
            Some(vec![0, 0, 0])
        );
        // Not a direct edge.
        assert_eq!(find_edge(&forest, "Jita", "J164522"), None);
        // Reversed direction does not match.
        assert_eq!(find_edge(&forest, "Perimeter", "Jita"), None);
    }

    #[test]
    fn get_and_remove_by_path() {
        let mut forest = sample();
        assert_eq!(get(&forest, &[0, 0]).map(|n| n.name.as_str()), Some("Perimeter"));
        assert!(get(&forest, &[0, 5]).is_none());

        let removed = remove(&mut forest, &[0, 0]).unwrap();
        assert_eq!(removed.name, "Perimeter");
        // Subtree comes out intact.
        assert_eq!(removed.connections[0].name, "J164522");
        assert!(forest.roots[0].connections.is_empty());

        let removed = remove(&mut forest, &[1]).unwrap();
        assert_eq!(removed.name, "Amarr");
        assert_eq!(forest.roots.len(), 1);
    }
}
