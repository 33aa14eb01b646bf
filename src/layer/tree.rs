//! Path-keyed arena of prim specs shared by layers and variant overlays.

use std::collections::{BTreeMap, HashMap};

use crate::layer::variant::VariantSet;
use crate::sdf::{Path, Value};

/// Opinions authored on one prim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrimSpec {
    /// Declared type tag. Empty means no type opinion.
    pub type_name: String,
    /// Child prim names in authoring order.
    pub children: Vec<String>,
    pub attributes: BTreeMap<String, Value>,
    pub variant_sets: BTreeMap<String, VariantSet>,
}

impl PrimSpec {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }
}

/// Prim specs rooted at `root`, indexed by absolute path.
///
/// `root` always has a spec. Children lists are the only parent/child links.
#[derive(Debug, Clone, PartialEq)]
pub struct SpecTree {
    root: Path,
    specs: HashMap<Path, PrimSpec>,
}

impl SpecTree {
    pub fn new(root: Path) -> Self {
        let mut specs = HashMap::new();
        specs.insert(root.clone(), PrimSpec::default());
        Self { root, specs }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.len() == 1 && self.specs.get(&self.root).is_some_and(|s| *s == PrimSpec::default())
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.specs.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&PrimSpec> {
        self.specs.get(path)
    }

    pub fn get_mut(&mut self, path: &Path) -> Option<&mut PrimSpec> {
        self.specs.get_mut(path)
    }

    /// Get the spec at `path`, creating it and any missing ancestors below
    /// `root` with an empty type. Returns `None` if `path` is outside `root`.
    pub fn ensure(&mut self, path: &Path) -> Option<&mut PrimSpec> {
        if !path.has_prefix(&self.root) {
            return None;
        }

        if !self.specs.contains_key(path) {
            let mut missing = vec![path.clone()];
            for ancestor in path.ancestors() {
                if self.specs.contains_key(&ancestor) {
                    break;
                }
                missing.push(ancestor);
            }

            // Outermost first so each parent exists before its child is linked.
            for p in missing.into_iter().rev() {
                if let (Some(parent), Some(name)) = (p.parent(), p.name()) {
                    if let Some(parent_spec) = self.specs.get_mut(&parent) {
                        parent_spec.children.push(name.to_owned());
                    }
                }
                self.specs.insert(p, PrimSpec::default());
            }
        }

        self.specs.get_mut(path)
    }

    /// Remove `path` and everything beneath it. The root cannot be removed.
    pub fn remove(&mut self, path: &Path) -> bool {
        if *path == self.root || !self.specs.contains_key(path) {
            return false;
        }

        self.specs.retain(|p, _| !p.has_prefix(path));

        if let (Some(parent), Some(name)) = (path.parent(), path.name()) {
            if let Some(parent_spec) = self.specs.get_mut(&parent) {
                parent_spec.children.retain(|child| child != name);
            }
        }
        true
    }

    /// All paths depth-first in children order, parents before children.
    pub fn walk(&self) -> Vec<Path> {
        let mut out = Vec::with_capacity(self.specs.len());
        let mut stack = vec![self.root.clone()];

        while let Some(path) = stack.pop() {
            if let Some(spec) = self.specs.get(&path) {
                for name in spec.children.iter().rev() {
                    if let Ok(child) = path.append_path(name) {
                        stack.push(child);
                    }
                }
            }
            out.push(path);
        }

        out
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (&Path, &mut PrimSpec)> {
        self.specs.iter_mut()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf;

    #[test]
    fn ensure_creates_ancestors_in_order() {
        let mut tree = SpecTree::new(Path::abs_root());
        tree.ensure(&sdf::path("/A/B/C").unwrap()).unwrap().type_name = "Mesh".into();
        tree.ensure(&sdf::path("/A/D").unwrap()).unwrap();

        let walked: Vec<_> = tree.walk().iter().map(|p| p.to_string()).collect();
        assert_eq!(walked, vec!["/", "/A", "/A/B", "/A/B/C", "/A/D"]);
        assert_eq!(tree.get(&sdf::path("/A").unwrap()).unwrap().type_name, "");
        assert_eq!(tree.get(&sdf::path("/A/B/C").unwrap()).unwrap().type_name, "Mesh");
    }

    #[test]
    fn ensure_rejects_paths_outside_root() {
        let mut tree = SpecTree::new(sdf::path("/Root").unwrap());
        assert!(tree.ensure(&sdf::path("/Other").unwrap()).is_none());
        assert!(tree.ensure(&sdf::path("/Root/Child").unwrap()).is_some());
    }

    #[test]
    fn remove_drops_subtree_and_unlinks() {
        let mut tree = SpecTree::new(Path::abs_root());
        tree.ensure(&sdf::path("/A/B/C").unwrap());
        tree.ensure(&sdf::path("/A/BB").unwrap());

        assert!(tree.remove(&sdf::path("/A/B").unwrap()));
        assert!(!tree.contains(&sdf::path("/A/B/C").unwrap()));
        assert!(tree.contains(&sdf::path("/A/BB").unwrap()));
        assert_eq!(tree.get(&sdf::path("/A").unwrap()).unwrap().children, vec!["BB"]);

        assert!(!tree.remove(&sdf::path("/A/B").unwrap()));
        assert!(!tree.remove(&Path::abs_root()));
    }
}
