//! Variant sets and variant edit contexts.
//!
//! A variant set lives on one prim and maps variant names to [`Overlay`]s.
//! [`VariantEditor`] is handed to the block of an edit context; every write it
//! performs lands in the target variant's overlay, never in the base tree.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Error, Result};
use crate::layer::tree::{PrimSpec, SpecTree};
use crate::layer::LayerId;
use crate::sdf::{self, Datum, Encoded, Path, Value, ValueKind};

/// Opinions scoped to one variant, rooted at the variant set's owning prim.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    tree: SpecTree,
}

impl Overlay {
    pub fn new(owner: Path) -> Self {
        Self {
            tree: SpecTree::new(owner),
        }
    }

    pub fn owner(&self) -> &Path {
        self.tree.root()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn get(&self, path: &Path) -> Option<&PrimSpec> {
        self.tree.get(path)
    }

    /// Overlay paths, owner first, parents before children.
    pub fn paths(&self) -> Vec<Path> {
        self.tree.walk()
    }

    pub(crate) fn tree(&self) -> &SpecTree {
        &self.tree
    }

    pub(crate) fn tree_mut(&mut self) -> &mut SpecTree {
        &mut self.tree
    }
}

/// A named group of mutually exclusive variants on one prim.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VariantSet {
    variants: BTreeMap<String, Overlay>,
    selection: Option<String>,
}

impl VariantSet {
    pub fn variant_names(&self) -> Vec<String> {
        self.variants.keys().cloned().collect()
    }

    pub fn overlay(&self, variant: &str) -> Option<&Overlay> {
        self.variants.get(variant)
    }

    pub fn selection(&self) -> Option<&str> {
        self.selection.as_deref()
    }

    pub fn selected_overlay(&self) -> Option<&Overlay> {
        self.selection.as_deref().and_then(|name| self.variants.get(name))
    }

    /// Register `variant` with an empty overlay if it has none yet.
    pub fn add_variant(&mut self, owner: &Path, variant: &str) -> &mut Overlay {
        self.variants
            .entry(variant.to_owned())
            .or_insert_with(|| Overlay::new(owner.clone()))
    }

    /// Select `variant`, registering it first if needed. Other overlays are kept.
    pub fn select(&mut self, owner: &Path, variant: &str) {
        self.add_variant(owner, variant);
        self.selection = Some(variant.to_owned());
    }

    pub(crate) fn insert_overlay(&mut self, variant: String, overlay: Overlay) {
        self.variants.insert(variant, overlay);
    }

    pub(crate) fn take_overlay(&mut self, variant: &str) -> Option<Overlay> {
        self.variants.remove(variant)
    }
}

/// Read-only snapshot of a variant set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantSetHandle {
    pub prim_path: Path,
    pub name: String,
    pub variants: Vec<String>,
    pub selection: Option<String>,
}

impl VariantSetHandle {
    pub(crate) fn new(prim_path: &Path, name: &str, set: &VariantSet) -> Self {
        Self {
            prim_path: prim_path.clone(),
            name: name.to_owned(),
            variants: set.variant_names(),
            selection: set.selection.clone(),
        }
    }
}

/// Which variant an edit context writes into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditTarget {
    pub prim: Path,
    pub set: String,
    pub variant: String,
}

/// Restores a variant's overlay to its state before a committed edit context.
#[derive(Debug)]
pub(crate) struct Undo {
    target: EditTarget,
    previous: Option<Overlay>,
    set_existed: bool,
}

impl Undo {
    fn apply(self, base: &mut SpecTree) {
        let Some(spec) = base.get_mut(&self.target.prim) else {
            return;
        };

        if !self.set_existed {
            spec.variant_sets.remove(&self.target.set);
            return;
        }

        if let Some(set) = spec.variant_sets.get_mut(&self.target.set) {
            match self.previous {
                Some(overlay) => set.insert_overlay(self.target.variant, overlay),
                None => {
                    set.take_overlay(&self.target.variant);
                }
            }
        }
    }
}

/// Store operations redirected into one variant's overlay.
///
/// Reads see the overlay's opinions first, then the base layer's.
pub struct VariantEditor<'a> {
    layer_id: &'a LayerId,
    base: &'a mut SpecTree,
    overlay: Overlay,
    target: EditTarget,
    active: Vec<Path>,
    undo: Vec<Undo>,
}

impl<'a> VariantEditor<'a> {
    pub fn target(&self) -> &EditTarget {
        &self.target
    }

    /// Define a prim in the overlay. Ancestors between the owning prim and
    /// `path` are added as typeless overs.
    pub fn define_prim(&mut self, path: &str, type_name: &str) -> Result<Path> {
        let path = self.check_target(path)?;
        check_type_name(&path, type_name)?;
        let spec = self
            .overlay
            .tree
            .ensure(&path)
            .ok_or_else(|| outside(&path, &self.target.prim))?;
        spec.type_name = type_name.to_owned();

        debug!(layer = %self.layer_id, prim = %path, variant = %self.target.variant, "define prim in variant");
        Ok(path)
    }

    /// Remove overlay opinions at and beneath `path`. Base prims are untouched.
    pub fn remove_prim(&mut self, path: &str) -> Result<bool> {
        let path = self.check_target(path)?;
        if path == self.target.prim {
            let had_opinions = !self.overlay.is_empty();
            self.overlay = Overlay::new(path);
            return Ok(had_opinions);
        }
        Ok(self.overlay.tree.remove(&path))
    }

    pub fn set_attribute(&mut self, path: &str, name: &str, kind: &str, value: impl Into<Datum>) -> Result<Encoded> {
        let encoded = sdf::encode(kind, &value.into())?;
        self.set_value(path, name, encoded.value.clone())?;
        Ok(encoded)
    }

    /// Write an already-typed value.
    pub fn set_value(&mut self, path: &str, name: &str, value: Value) -> Result<()> {
        let path = self.check_target(path)?;
        if !sdf::is_property_name(name) {
            return Err(Error::invalid_path(
                format!("{path}.{name}"),
                "not a valid attribute name",
            ));
        }
        if !self.overlay.tree.contains(&path) && !self.base.contains(&path) {
            return Err(Error::prim_not_found(self.layer_id.as_str(), &path));
        }

        let spec = self
            .overlay
            .tree
            .ensure(&path)
            .ok_or_else(|| outside(&path, &self.target.prim))?;
        spec.attributes.insert(name.to_owned(), value);

        debug!(layer = %self.layer_id, prim = %path, attribute = name, variant = %self.target.variant, "set attribute in variant");
        Ok(())
    }

    pub fn remove_attribute(&mut self, path: &str, name: &str) -> Result<bool> {
        let path = self.check_target(path)?;
        Ok(self
            .overlay
            .tree
            .get_mut(&path)
            .is_some_and(|spec| spec.attributes.remove(name).is_some()))
    }

    pub fn get_attribute(&self, path: &str, name: &str) -> Option<(ValueKind, Value)> {
        let path = Path::new(path).ok()?;
        self.overlay
            .tree
            .get(&path)
            .and_then(|spec| spec.attributes.get(name))
            .or_else(|| self.base.get(&path).and_then(|spec| spec.attributes.get(name)))
            .map(|value| (value.kind(), value.clone()))
    }

    pub fn prim_exists(&self, path: &str) -> bool {
        Path::new(path).is_ok_and(|path| self.overlay.tree.contains(&path) || self.base.contains(&path))
    }

    /// Open an edit context on another prim's variant from inside this one.
    ///
    /// The prim must not be, contain, or lie beneath any prim that already
    /// has an active context.
    pub fn with_variant_edit_context<R>(
        &mut self,
        path: &str,
        set: &str,
        variant: &str,
        block: impl FnOnce(&mut VariantEditor<'_>) -> Result<R>,
    ) -> Result<R> {
        let prim = Path::new(path)?;
        let target = EditTarget {
            prim,
            set: set.to_owned(),
            variant: variant.to_owned(),
        };
        let (result, undo) = run_edit(self.base, self.layer_id, target, &self.active, block)?;
        self.undo.extend(undo);
        Ok(result)
    }

    fn check_target(&self, path: &str) -> Result<Path> {
        let path = Path::new(path)?;
        if !path.has_prefix(&self.target.prim) {
            return Err(outside(&path, &self.target.prim));
        }
        Ok(path)
    }
}

/// Variant set names are identifiers; variant names are non-empty.
pub(crate) fn check_names(set: &str, variant: Option<&str>) -> Result<()> {
    if !sdf::is_identifier(set) {
        return Err(Error::invalid_path(set, "variant set names must be identifiers"));
    }
    if variant.is_some_and(str::is_empty) {
        return Err(Error::invalid_path(set, "variant names must not be empty"));
    }
    Ok(())
}

/// Type tags are empty (no opinion) or a single identifier.
pub(crate) fn check_type_name(path: &Path, type_name: &str) -> Result<()> {
    if type_name.is_empty() || sdf::is_identifier(type_name) {
        return Ok(());
    }
    Err(Error::invalid_path(
        path.as_str(),
        format!("type name {type_name:?} is not an identifier"),
    ))
}

fn outside(path: &Path, target: &Path) -> Error {
    Error::OutsideEditTarget {
        path: path.to_string(),
        target: target.to_string(),
    }
}

/// Run `block` with writes redirected into `target`'s overlay.
///
/// On success the overlay is stored back and the undo records of this context
/// (and of every context nested in it) are returned. On failure every overlay
/// touched by this context is restored before the error is returned.
pub(crate) fn run_edit<R>(
    base: &mut SpecTree,
    layer_id: &LayerId,
    target: EditTarget,
    active: &[Path],
    block: impl FnOnce(&mut VariantEditor<'_>) -> Result<R>,
) -> Result<(R, Vec<Undo>)> {
    if target.prim.is_abs_root() {
        return Err(Error::invalid_path("/", "the pseudo-root cannot hold variant sets"));
    }
    check_names(&target.set, Some(&target.variant))?;
    if let Some(conflict) = active
        .iter()
        .find(|a| a.has_prefix(&target.prim) || target.prim.has_prefix(a))
    {
        return Err(Error::NestedEditContext {
            active: conflict.to_string(),
            requested: target.prim.to_string(),
        });
    }

    let spec = base
        .get_mut(&target.prim)
        .ok_or_else(|| Error::prim_not_found(layer_id.as_str(), &target.prim))?;
    let set_existed = spec.variant_sets.contains_key(&target.set);
    let set = spec.variant_sets.entry(target.set.clone()).or_default();
    let previous = set.overlay(&target.variant).cloned();
    let overlay = set
        .take_overlay(&target.variant)
        .unwrap_or_else(|| Overlay::new(target.prim.clone()));

    let mut nested_active = active.to_vec();
    nested_active.push(target.prim.clone());

    let mut editor = VariantEditor {
        layer_id,
        base: &mut *base,
        overlay,
        target,
        active: nested_active,
        undo: Vec::new(),
    };
    let result = block(&mut editor);
    let VariantEditor {
        overlay,
        target,
        mut undo,
        ..
    } = editor;

    match result {
        Ok(value) => {
            if let Some(set) = base
                .get_mut(&target.prim)
                .and_then(|spec| spec.variant_sets.get_mut(&target.set))
            {
                set.insert_overlay(target.variant.clone(), overlay);
            }
            undo.push(Undo {
                target,
                previous,
                set_existed,
            });
            Ok((value, undo))
        }
        Err(err) => {
            for record in undo.into_iter().rev() {
                record.apply(base);
            }
            Undo {
                target,
                previous,
                set_existed,
            }
            .apply(base);
            Err(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layer::Layer;
    use crate::ErrorKind;

    fn layer_with_root() -> Layer {
        let mut layer = Layer::new(LayerId::new("variants.usda").unwrap());
        layer.define_prim(&sdf::path("/Root").unwrap(), "Xform").unwrap();
        layer
            .set_attribute(&sdf::path("/Root").unwrap(), "color", Value::from("grey"))
            .unwrap();
        layer
    }

    #[test]
    fn writes_land_in_overlay_only() {
        let mut layer = layer_with_root();
        let root = sdf::path("/Root").unwrap();

        layer
            .edit_variant(&root, "look", "red", |ed| {
                ed.set_attribute("/Root", "color", "string", "red")?;
                assert_eq!(ed.get_attribute("/Root", "color").unwrap().1, Value::from("red"));
                ed.define_prim("/Root/Trim", "Mesh")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(layer.get_attribute(&root, "color"), Some(&Value::from("grey")));
        assert!(!layer.prim_exists(&sdf::path("/Root/Trim").unwrap()));

        let overlay = layer.variant_set(&root, "look").unwrap().overlay("red").unwrap();
        assert_eq!(
            overlay.get(&root).unwrap().attributes.get("color"),
            Some(&Value::from("red"))
        );
        assert_eq!(overlay.get(&sdf::path("/Root/Trim").unwrap()).unwrap().type_name, "Mesh");
    }

    #[test]
    fn failed_block_restores_overlay() {
        let mut layer = layer_with_root();
        let root = sdf::path("/Root").unwrap();

        layer
            .edit_variant(&root, "look", "red", |ed| {
                ed.set_attribute("/Root", "color", "string", "red").map(|_| ())
            })
            .unwrap();
        let before = layer.clone();

        let err = layer
            .edit_variant(&root, "look", "red", |ed| {
                ed.set_attribute("/Root", "color", "string", "crimson")?;
                ed.set_attribute("/Root/Missing", "color", "string", "x")?;
                Ok(())
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PrimNotFound);
        assert!(layer.content_eq(&before));
    }

    #[test]
    fn failed_first_entry_leaves_no_variant_set() {
        let mut layer = layer_with_root();
        let root = sdf::path("/Root").unwrap();

        let _ = layer.edit_variant(&root, "look", "red", |ed| ed.define_prim("/Elsewhere", "Xform"));
        assert!(layer.variant_set(&root, "look").is_none());
    }

    #[test]
    fn writes_outside_target_are_rejected() {
        let mut layer = layer_with_root();
        layer.define_prim(&sdf::path("/Other").unwrap(), "Xform").unwrap();

        let err = layer
            .edit_variant(&sdf::path("/Root").unwrap(), "look", "red", |ed| {
                ed.define_prim("/Other/Child", "Mesh")
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::OutsideEditTarget);
    }

    #[test]
    fn nesting_on_same_or_related_prim_fails() {
        let mut layer = layer_with_root();
        layer.define_prim(&sdf::path("/Root/Child").unwrap(), "Xform").unwrap();
        let root = sdf::path("/Root").unwrap();

        for nested in ["/Root", "/Root/Child"] {
            let err = layer
                .edit_variant(&root, "look", "red", |ed| {
                    ed.with_variant_edit_context(nested, "look", "blue", |_| Ok(()))
                })
                .unwrap_err();
            assert_eq!(err.kind(), ErrorKind::NestedEditContext, "nesting on {nested}");
        }
    }

    #[test]
    fn nesting_on_unrelated_prim_is_rolled_back_with_outer_failure() {
        let mut layer = layer_with_root();
        layer.define_prim(&sdf::path("/Other").unwrap(), "Xform").unwrap();
        let before = layer.clone();

        let result: Result<()> = layer.edit_variant(&sdf::path("/Root").unwrap(), "look", "red", |ed| {
            ed.with_variant_edit_context("/Other", "size", "big", |inner| {
                inner.set_attribute("/Other", "scale", "float", 2.0_f64)?;
                Ok(())
            })?;
            Err(Error::unsupported("string", "forced failure"))
        });

        assert!(result.is_err());
        assert!(layer.content_eq(&before));
    }

    #[test]
    fn nested_commit_persists_on_success() {
        let mut layer = layer_with_root();
        layer.define_prim(&sdf::path("/Other").unwrap(), "Xform").unwrap();
        let other = sdf::path("/Other").unwrap();

        layer
            .edit_variant(&sdf::path("/Root").unwrap(), "look", "red", |ed| {
                ed.with_variant_edit_context("/Other", "size", "big", |inner| {
                    inner.set_attribute("/Other", "scale", "float", 2.0_f64).map(|_| ())
                })
            })
            .unwrap();

        let overlay = layer.variant_set(&other, "size").unwrap().overlay("big").unwrap();
        assert_eq!(overlay.get(&other).unwrap().attributes.get("scale"), Some(&Value::Float(2.0)));
    }

    #[test]
    fn select_keeps_other_overlays() {
        let mut layer = layer_with_root();
        let root = sdf::path("/Root").unwrap();

        layer
            .edit_variant(&root, "look", "red", |ed| {
                ed.set_attribute("/Root", "tint", "string", "red").map(|_| ())
            })
            .unwrap();
        layer.select_variant(&root, "look", "blue").unwrap();
        layer.select_variant(&root, "look", "red").unwrap();

        let set = layer.variant_set(&root, "look").unwrap();
        assert_eq!(set.selection(), Some("red"));
        assert_eq!(set.variant_names(), vec!["blue", "red"]);
        assert!(!set.overlay("red").unwrap().is_empty());
        assert!(set.overlay("blue").unwrap().is_empty());
    }
}
