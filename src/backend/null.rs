use tracing::{debug, warn};

use crate::composition::ComposedLayer;
use crate::error::Result;
use crate::layer::{Layer, LayerId, VariantSetHandle};
use crate::sdf::{Datum, Encoded, Path, Value, ValueKind};

use super::{Backend, EditBlock, Outcome};

/// Acknowledges every mutation without performing it. Reads see an empty world.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullBackend;

impl NullBackend {
    fn acknowledge<T>(message: String) -> Result<Outcome<T>> {
        debug!(backend = "null", "{message}");
        Ok(Outcome::Acknowledged(message))
    }
}

impl Backend for NullBackend {
    fn name(&self) -> &'static str {
        "null"
    }

    fn create_new(&mut self, id: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would create layer '{id}'"))
    }

    fn open(&mut self, id: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would open layer '{id}'"))
    }

    fn close(&mut self, id: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would close layer '{id}'"))
    }

    fn is_open(&self, _id: &str) -> bool {
        false
    }

    fn is_dirty(&self, _id: &str) -> bool {
        false
    }

    fn save(&mut self, id: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would save layer '{id}'"))
    }

    fn export(&mut self, id: &str, new_id: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would export layer '{id}' to '{new_id}'"))
    }

    fn list_persisted(&self) -> Result<Vec<LayerId>> {
        Ok(Vec::new())
    }

    fn layer(&self, _id: &str) -> Option<&Layer> {
        None
    }

    fn define_prim(&mut self, id: &str, path: &str, type_name: &str) -> Result<Outcome<Path>> {
        Self::acknowledge(format!("degraded: would define prim <{path}> of type '{type_name}' in '{id}'"))
    }

    fn remove_prim(&mut self, id: &str, path: &str) -> Result<Outcome<bool>> {
        Self::acknowledge(format!("degraded: would remove prim <{path}> from '{id}'"))
    }

    fn set_attribute(
        &mut self,
        id: &str,
        path: &str,
        name: &str,
        kind: &str,
        _value: &Datum,
    ) -> Result<Outcome<Encoded>> {
        Self::acknowledge(format!("degraded: would set {kind} attribute '{name}' on <{path}> in '{id}'"))
    }

    fn remove_attribute(&mut self, id: &str, path: &str, name: &str) -> Result<Outcome<bool>> {
        Self::acknowledge(format!("degraded: would remove attribute '{name}' from <{path}> in '{id}'"))
    }

    fn get_attribute(&self, _id: &str, _path: &str, _name: &str) -> Option<(ValueKind, Value)> {
        None
    }

    fn prim_exists(&self, _id: &str, _path: &str) -> bool {
        false
    }

    fn prim_type(&self, _id: &str, _path: &str) -> Result<Option<String>> {
        Ok(None)
    }

    fn children(&self, _id: &str, _path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn traverse(&self, _id: &str) -> Result<Vec<Path>> {
        Ok(Vec::new())
    }

    fn attribute_names(&self, _id: &str, _path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn create_variant_set(&mut self, id: &str, path: &str, set: &str) -> Result<Outcome<bool>> {
        Self::acknowledge(format!("degraded: would create variant set '{set}' on <{path}> in '{id}'"))
    }

    fn get_variant_set(&self, _id: &str, _path: &str, _set: &str) -> Result<Option<VariantSetHandle>> {
        Ok(None)
    }

    fn variant_set_names(&self, _id: &str, _path: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    fn add_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would add variant {set}={variant} on <{path}> in '{id}'"))
    }

    fn select_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>> {
        Self::acknowledge(format!("degraded: would select variant {set}={variant} on <{path}> in '{id}'"))
    }

    fn edit_variant(
        &mut self,
        id: &str,
        path: &str,
        set: &str,
        variant: &str,
        _block: &mut EditBlock<'_>,
    ) -> Result<Outcome<()>> {
        warn!(layer = id, prim = path, set, variant, "edit block skipped in degraded mode");
        Self::acknowledge(format!(
            "degraded: would edit variant {set}={variant} on <{path}> in '{id}'"
        ))
    }

    fn compose(&mut self, base: &str, overlays: &[&str], output: &str) -> Result<Outcome<ComposedLayer>> {
        Self::acknowledge(format!(
            "degraded: would compose '{base}' with [{}] into '{output}'",
            overlays.join(", ")
        ))
    }

    fn flatten(&mut self, id: &str, output: &str) -> Result<Outcome<Layer>> {
        Self::acknowledge(format!("degraded: would flatten '{id}' into '{output}'"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mutations_are_acknowledged() {
        let mut backend = NullBackend;
        let outcome = backend.define_prim("scene.usda", "/Root", "Xform").unwrap();
        assert!(outcome
            .acknowledgment()
            .is_some_and(|m| m.contains("/Root") && m.contains("Xform")));
        assert!(!backend.prim_exists("scene.usda", "/Root"));
    }

    #[test]
    fn invalid_input_is_still_acknowledged() {
        let mut backend = NullBackend;
        assert!(backend.define_prim("", "not a path", "").unwrap().is_acknowledged());
        assert!(backend
            .set_attribute("x", "/A", "bad name", "int", &Datum::from("five"))
            .unwrap()
            .is_acknowledged());
        assert!(backend.compose("a", &["b", "c"], "out").unwrap().is_acknowledged());
    }

    #[test]
    fn edit_block_is_not_run() {
        let mut backend = NullBackend;
        let mut ran = false;
        let outcome = backend
            .edit_variant("scene.usda", "/Root", "look", "red", &mut |_| {
                ran = true;
                Ok(())
            })
            .unwrap();
        assert!(outcome.is_acknowledged());
        assert!(!ran);
    }
}
