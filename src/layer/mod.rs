//! In-memory scene documents.
//!
//! A [`Layer`] owns one prim tree: an arena of [`PrimSpec`]s keyed by
//! [`Path`], rooted at the pseudo-root `/`. Mutations mark the layer dirty
//! until it is flushed by the storage backend.

mod tree;
pub mod variant;

use std::fmt;

use tracing::debug;

use crate::error::{Error, Result};
use crate::sdf::{self, Path, Value};

pub use tree::{PrimSpec, SpecTree};
pub use variant::{EditTarget, Overlay, VariantEditor, VariantSet, VariantSetHandle};

/// Identifier of a persistent document, e.g. `"assets/chair.usda"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerId(String);

impl LayerId {
    /// Identifiers are relative, non-empty, and may not contain `..` or empty
    /// components. The file name ends in `.usda` and is not hidden, matching
    /// what [`FileStorage`](crate::storage::FileStorage) lists.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.starts_with('/')
            && !id.contains('\\')
            && id.split('/').all(|part| !part.is_empty() && part != "." && part != "..")
            && has_text_extension(&id);

        if !valid {
            return Err(Error::invalid_path(id, "not a valid document identifier"));
        }
        Ok(LayerId(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn has_text_extension(id: &str) -> bool {
    let file_name = id.rsplit('/').next().unwrap_or(id);
    match file_name.rsplit_once('.') {
        Some((stem, ext)) => !stem.is_empty() && !stem.starts_with('.') && ext.eq_ignore_ascii_case("usda"),
        None => false,
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for LayerId {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self> {
        LayerId::new(value)
    }
}

/// One open scene document.
#[derive(Debug, Clone)]
pub struct Layer {
    identifier: LayerId,
    tree: SpecTree,
    dirty: bool,
}

impl Layer {
    /// Create an empty layer holding only the pseudo-root.
    pub fn new(identifier: LayerId) -> Self {
        Self {
            identifier,
            tree: SpecTree::new(Path::abs_root()),
            dirty: false,
        }
    }

    pub(crate) fn from_tree(identifier: LayerId, tree: SpecTree) -> Self {
        Self {
            identifier,
            tree,
            dirty: false,
        }
    }

    pub fn identifier(&self) -> &LayerId {
        &self.identifier
    }

    /// Same content under another identifier. The copy starts dirty.
    pub fn with_identifier(&self, identifier: LayerId) -> Self {
        Self {
            identifier,
            tree: self.tree.clone(),
            dirty: true,
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn mark_clean(&mut self) {
        self.dirty = false;
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn tree(&self) -> &SpecTree {
        &self.tree
    }

    /// Compare prims, attributes and variants, ignoring identifier and dirty state.
    pub fn content_eq(&self, other: &Layer) -> bool {
        self.tree == other.tree
    }

    /// Create `path` (and missing ancestors, untyped) or retype it.
    pub fn define_prim(&mut self, path: &Path, type_name: &str) -> Result<Path> {
        if path.is_abs_root() {
            return Err(Error::invalid_path("/", "the pseudo-root cannot be defined"));
        }
        variant::check_type_name(path, type_name)?;

        let existed = self.tree.contains(path);
        let spec = self
            .tree
            .ensure(path)
            .ok_or_else(|| Error::invalid_path(path.as_str(), "outside the layer root"))?;

        if spec.type_name != type_name {
            spec.type_name = type_name.to_owned();
            self.dirty = true;
        }
        if !existed {
            self.dirty = true;
        }

        debug!(layer = %self.identifier, prim = %path, type_name, created = !existed, "define prim");
        Ok(path.clone())
    }

    /// Remove `path` and its subtree. Returns whether anything was removed.
    pub fn remove_prim(&mut self, path: &Path) -> Result<bool> {
        if path.is_abs_root() {
            return Err(Error::invalid_path("/", "the pseudo-root cannot be removed"));
        }

        let removed = self.tree.remove(path);
        if removed {
            self.dirty = true;
        }
        debug!(layer = %self.identifier, prim = %path, removed, "remove prim");
        Ok(removed)
    }

    /// Create or replace attribute `name` on `path`. The stored kind is always
    /// the kind of `value`, whatever was there before.
    pub fn set_attribute(&mut self, path: &Path, name: &str, value: Value) -> Result<()> {
        if !sdf::is_property_name(name) {
            return Err(Error::invalid_path(format!("{path}.{name}"), "not a valid attribute name"));
        }
        if path.is_abs_root() {
            return Err(Error::invalid_path("/", "the pseudo-root carries no attributes"));
        }

        let spec = self
            .tree
            .get_mut(path)
            .ok_or_else(|| Error::prim_not_found(self.identifier.as_str(), path))?;
        spec.attributes.insert(name.to_owned(), value);
        self.dirty = true;

        debug!(layer = %self.identifier, prim = %path, attribute = name, "set attribute");
        Ok(())
    }

    pub fn get_attribute(&self, path: &Path, name: &str) -> Option<&Value> {
        self.tree.get(path).and_then(|spec| spec.attributes.get(name))
    }

    /// Remove attribute `name`. A missing prim or attribute is not an error.
    pub fn remove_attribute(&mut self, path: &Path, name: &str) -> Result<bool> {
        let removed = self
            .tree
            .get_mut(path)
            .is_some_and(|spec| spec.attributes.remove(name).is_some());
        if removed {
            self.dirty = true;
        }
        Ok(removed)
    }

    pub fn attribute_names(&self, path: &Path) -> Vec<String> {
        self.tree
            .get(path)
            .map(|spec| spec.attributes.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn prim(&self, path: &Path) -> Option<&PrimSpec> {
        self.tree.get(path)
    }

    pub fn prim_exists(&self, path: &Path) -> bool {
        self.tree.contains(path)
    }

    pub fn children(&self, path: &Path) -> Vec<String> {
        self.tree
            .get(path)
            .map(|spec| spec.children.clone())
            .unwrap_or_default()
    }

    /// Every prim (pseudo-root excluded), depth-first in authoring order.
    pub fn traverse(&self) -> Vec<Path> {
        self.tree.walk().into_iter().filter(|p| !p.is_abs_root()).collect()
    }

    /// Create variant set `set` on `path` if absent. Returns whether it was created.
    pub fn create_variant_set(&mut self, path: &Path, set: &str) -> Result<bool> {
        variant::check_names(set, None)?;
        let spec = self.variant_owner(path)?;
        if spec.variant_sets.contains_key(set) {
            return Ok(false);
        }
        spec.variant_sets.insert(set.to_owned(), VariantSet::default());
        self.dirty = true;

        debug!(layer = %self.identifier, prim = %path, set, "create variant set");
        Ok(true)
    }

    pub fn variant_set(&self, path: &Path, set: &str) -> Option<&VariantSet> {
        self.tree.get(path).and_then(|spec| spec.variant_sets.get(set))
    }

    pub fn variant_set_names(&self, path: &Path) -> Vec<String> {
        self.tree
            .get(path)
            .map(|spec| spec.variant_sets.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Register an empty variant without selecting it.
    pub fn add_variant(&mut self, path: &Path, set: &str, variant: &str) -> Result<()> {
        variant::check_names(set, Some(variant))?;
        let spec = self.variant_owner(path)?;
        spec.variant_sets
            .entry(set.to_owned())
            .or_default()
            .add_variant(path, variant);
        self.dirty = true;
        Ok(())
    }

    /// Select `variant` in `set`, creating both if needed.
    pub fn select_variant(&mut self, path: &Path, set: &str, variant: &str) -> Result<()> {
        variant::check_names(set, Some(variant))?;
        let spec = self.variant_owner(path)?;
        spec.variant_sets.entry(set.to_owned()).or_default().select(path, variant);
        self.dirty = true;

        debug!(layer = %self.identifier, prim = %path, set, variant, "select variant");
        Ok(())
    }

    /// Run `block` with writes redirected into the overlay of `variant`.
    ///
    /// The base tree is never written by the block. If the block fails, the
    /// overlay is restored to what it was on entry.
    pub fn edit_variant<R>(
        &mut self,
        path: &Path,
        set: &str,
        variant: &str,
        block: impl FnOnce(&mut VariantEditor<'_>) -> Result<R>,
    ) -> Result<R> {
        let target = EditTarget {
            prim: path.clone(),
            set: set.to_owned(),
            variant: variant.to_owned(),
        };
        let (result, _) = variant::run_edit(&mut self.tree, &self.identifier, target, &[], block)?;
        self.dirty = true;
        Ok(result)
    }

    fn variant_owner(&mut self, path: &Path) -> Result<&mut PrimSpec> {
        if path.is_abs_root() {
            return Err(Error::invalid_path("/", "the pseudo-root cannot hold variant sets"));
        }
        self.tree
            .get_mut(path)
            .ok_or_else(|| Error::prim_not_found(self.identifier.as_str(), path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdf::ValueKind;
    use crate::ErrorKind;

    fn layer() -> Layer {
        Layer::new(LayerId::new("test.usda").unwrap())
    }

    #[test]
    fn layer_ids_are_validated() {
        assert!(LayerId::new("scene.usda").is_ok());
        assert!(LayerId::new("assets/chair.usda").is_ok());
        assert!(LayerId::new("Shot.USDA").is_ok());
        for bad in [
            "",
            "/abs.usda",
            "../up.usda",
            "a//b.usda",
            "a/./b.usda",
            "win\\path.usda",
            "scene",
            "scene.usdc",
            "dir/.usda",
            "dir/.hidden.usda",
            "scene.usda/",
        ] {
            assert!(LayerId::new(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn define_creates_untyped_ancestors() {
        let mut layer = layer();
        let path = layer.define_prim(&sdf::path("/World/Geom/Mesh").unwrap(), "Mesh").unwrap();
        assert_eq!(path.as_str(), "/World/Geom/Mesh");

        assert_eq!(layer.prim(&sdf::path("/World").unwrap()).unwrap().type_name, "");
        assert_eq!(layer.prim(&sdf::path("/World/Geom").unwrap()).unwrap().type_name, "");
        assert_eq!(layer.children(&Path::abs_root()), vec!["World"]);
        assert!(layer.is_dirty());
    }

    #[test]
    fn define_is_idempotent_and_retypes() {
        let mut layer = layer();
        let p = sdf::path("/Root").unwrap();
        layer.define_prim(&p, "Xform").unwrap();
        let snapshot = layer.clone();
        layer.mark_clean();

        layer.define_prim(&p, "Xform").unwrap();
        assert!(layer.content_eq(&snapshot));
        assert!(!layer.is_dirty());

        layer.define_prim(&p, "Scope").unwrap();
        assert_eq!(layer.prim(&p).unwrap().type_name, "Scope");
        assert_eq!(layer.children(&Path::abs_root()), vec!["Root"]);
    }

    #[test]
    fn remove_missing_prim_is_tolerated() {
        let mut layer = layer();
        assert!(!layer.remove_prim(&sdf::path("/Nope").unwrap()).unwrap());
        assert_eq!(layer.remove_prim(&Path::abs_root()).unwrap_err().kind(), ErrorKind::InvalidPath);
    }

    #[test]
    fn remove_cascades_variant_sets() {
        let mut layer = layer();
        let p = sdf::path("/Root/Child").unwrap();
        layer.define_prim(&p, "Xform").unwrap();
        layer.select_variant(&p, "look", "red").unwrap();

        layer.remove_prim(&sdf::path("/Root").unwrap()).unwrap();
        assert!(layer.variant_set(&p, "look").is_none());
        assert!(layer.traverse().is_empty());

        layer.define_prim(&p, "Xform").unwrap();
        assert!(layer.variant_set_names(&p).is_empty());
    }

    #[test]
    fn set_attribute_requires_prim_and_replaces_kind() {
        let mut layer = layer();
        let p = sdf::path("/Root").unwrap();

        let err = layer.set_attribute(&p, "size", Value::Int(5)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrimNotFound);

        layer.define_prim(&p, "Xform").unwrap();
        layer.set_attribute(&p, "size", Value::Int(5)).unwrap();
        assert_eq!(layer.get_attribute(&p, "size"), Some(&Value::Int(5)));

        layer.set_attribute(&p, "size", Value::from("large")).unwrap();
        assert_eq!(layer.get_attribute(&p, "size").map(Value::kind), Some(ValueKind::String));

        let err = layer.set_attribute(&p, "bad name", Value::Int(1)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
    }

    #[test]
    fn traverse_is_depth_first_in_authoring_order() {
        let mut layer = layer();
        for p in ["/B", "/A/Z", "/A/Y", "/C"] {
            layer.define_prim(&sdf::path(p).unwrap(), "Xform").unwrap();
        }
        let order: Vec<_> = layer.traverse().iter().map(|p| p.to_string()).collect();
        assert_eq!(order, vec!["/B", "/A", "/A/Z", "/A/Y", "/C"]);
    }

    #[test]
    fn variant_set_requires_prim() {
        let mut layer = layer();
        let err = layer
            .create_variant_set(&sdf::path("/Missing").unwrap(), "look")
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrimNotFound);
    }

    #[test]
    fn variant_names_are_validated() {
        let mut layer = layer();
        let p = sdf::path("/Root").unwrap();
        layer.define_prim(&p, "Xform").unwrap();

        assert_eq!(layer.create_variant_set(&p, "has space").unwrap_err().kind(), ErrorKind::InvalidPath);
        assert_eq!(layer.add_variant(&p, "look", "").unwrap_err().kind(), ErrorKind::InvalidPath);
        let err = layer.edit_variant(&p, "", "red", |_| Ok(())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidPath);
        assert!(layer.variant_set_names(&p).is_empty());
    }

    #[test]
    fn type_tags_must_be_identifiers() {
        let mut layer = layer();
        let p = sdf::path("/Light").unwrap();
        for bad in ["My Light", "ns:Mesh", "2D", "Mesh\""] {
            let err = layer.define_prim(&p, bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath, "{bad:?} should be rejected");
        }
        assert!(!layer.prim_exists(&p));
        assert!(!layer.is_dirty());

        // Keyword-shaped tags are plain identifiers.
        layer.define_prim(&p, "def").unwrap();
        assert_eq!(layer.prim(&p).unwrap().type_name, "def");
        layer.define_prim(&p, "").unwrap();
        assert_eq!(layer.prim(&p).unwrap().type_name, "");
    }
}
