use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::composition::{self, ComposedLayer};
use crate::error::{Error, Result};
use crate::layer::{Layer, LayerId, VariantSetHandle};
use crate::sdf::{self, Datum, Encoded, Path, Value, ValueKind};
use crate::storage::LayerStorage;

use super::{Backend, EditBlock, Outcome};

/// Open documents plus the storage they are loaded from and saved to.
pub struct RealBackend {
    storage: Arc<dyn LayerStorage>,
    layers: BTreeMap<LayerId, Layer>,
}

impl RealBackend {
    pub fn new(storage: Arc<dyn LayerStorage>) -> Self {
        Self {
            storage,
            layers: BTreeMap::new(),
        }
    }

    /// Identifiers of the open documents, sorted.
    pub fn open_layers(&self) -> Vec<LayerId> {
        self.layers.keys().cloned().collect()
    }

    fn get(&self, id: &str) -> Result<&Layer> {
        LayerId::new(id)
            .ok()
            .and_then(|layer_id| self.layers.get(&layer_id))
            .ok_or_else(|| Error::document_not_open(id))
    }

    fn get_mut(&mut self, id: &str) -> Result<&mut Layer> {
        LayerId::new(id)
            .ok()
            .and_then(|layer_id| self.layers.get_mut(&layer_id))
            .ok_or_else(|| Error::document_not_open(id))
    }

    fn input(&self, id: &str) -> Result<&Layer> {
        LayerId::new(id)
            .ok()
            .and_then(|layer_id| self.layers.get(&layer_id))
            .ok_or_else(|| Error::LayerNotFound { id: id.to_owned() })
    }
}

impl std::fmt::Debug for RealBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealBackend")
            .field("layers", &self.layers.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Backend for RealBackend {
    fn name(&self) -> &'static str {
        "real"
    }

    fn create_new(&mut self, id: &str) -> Result<Outcome<()>> {
        let layer_id = LayerId::new(id)?;
        if self.layers.contains_key(&layer_id) {
            return Err(Error::Storage(anyhow::anyhow!("Layer '{id}' is already open")));
        }

        debug!(layer = %layer_id, "create layer");
        self.layers.insert(layer_id.clone(), Layer::new(layer_id));
        Ok(Outcome::Applied(()))
    }

    fn open(&mut self, id: &str) -> Result<Outcome<()>> {
        let layer_id = LayerId::new(id)?;
        if self.layers.contains_key(&layer_id) {
            return Ok(Outcome::Applied(()));
        }

        let tree = self
            .storage
            .load(&layer_id)?
            .ok_or_else(|| Error::document_not_open(id))?;

        info!(layer = %layer_id, prims = tree.len() - 1, "opened layer");
        self.layers.insert(layer_id.clone(), Layer::from_tree(layer_id, tree));
        Ok(Outcome::Applied(()))
    }

    fn close(&mut self, id: &str) -> Result<Outcome<()>> {
        let layer_id = LayerId::new(id).map_err(|_| Error::document_not_open(id))?;
        let layer = self
            .layers
            .remove(&layer_id)
            .ok_or_else(|| Error::document_not_open(id))?;

        debug!(layer = %layer_id, discarded_changes = layer.is_dirty(), "close layer");
        Ok(Outcome::Applied(()))
    }

    fn is_open(&self, id: &str) -> bool {
        self.get(id).is_ok()
    }

    fn is_dirty(&self, id: &str) -> bool {
        self.get(id).is_ok_and(Layer::is_dirty)
    }

    fn save(&mut self, id: &str) -> Result<Outcome<()>> {
        let layer = self.get(id)?;
        self.storage.store(layer.identifier(), layer.tree())?;
        info!(layer = %layer.identifier(), "saved layer");

        self.get_mut(id)?.mark_clean();
        Ok(Outcome::Applied(()))
    }

    fn export(&mut self, id: &str, new_id: &str) -> Result<Outcome<()>> {
        let target = LayerId::new(new_id)?;
        let layer = self.get(id)?;
        self.storage.store(&target, layer.tree())?;

        info!(layer = %layer.identifier(), to = %target, "exported layer");
        Ok(Outcome::Applied(()))
    }

    fn list_persisted(&self) -> Result<Vec<LayerId>> {
        Ok(self.storage.list()?)
    }

    fn layer(&self, id: &str) -> Option<&Layer> {
        self.get(id).ok()
    }

    fn define_prim(&mut self, id: &str, path: &str, type_name: &str) -> Result<Outcome<Path>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer.define_prim(&path, type_name).map(Outcome::Applied)
    }

    fn remove_prim(&mut self, id: &str, path: &str) -> Result<Outcome<bool>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer.remove_prim(&path).map(Outcome::Applied)
    }

    fn set_attribute(
        &mut self,
        id: &str,
        path: &str,
        name: &str,
        kind: &str,
        value: &Datum,
    ) -> Result<Outcome<Encoded>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        let encoded = sdf::encode(kind, value)?;
        if encoded.lossy {
            debug!(layer = %layer.identifier(), prim = %path, attribute = name, kind, "unknown kind stored as string");
        }

        layer.set_attribute(&path, name, encoded.value.clone())?;
        Ok(Outcome::Applied(encoded))
    }

    fn remove_attribute(&mut self, id: &str, path: &str, name: &str) -> Result<Outcome<bool>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer.remove_attribute(&path, name).map(Outcome::Applied)
    }

    fn get_attribute(&self, id: &str, path: &str, name: &str) -> Option<(ValueKind, Value)> {
        let path = sdf::path(path).ok()?;
        let value = self.get(id).ok()?.get_attribute(&path, name)?;
        Some((value.kind(), value.clone()))
    }

    fn prim_exists(&self, id: &str, path: &str) -> bool {
        match (self.get(id), sdf::path(path)) {
            (Ok(layer), Ok(path)) => layer.prim_exists(&path),
            _ => false,
        }
    }

    fn prim_type(&self, id: &str, path: &str) -> Result<Option<String>> {
        let path = sdf::path(path)?;
        Ok(self.get(id)?.prim(&path).map(|spec| spec.type_name.clone()))
    }

    fn children(&self, id: &str, path: &str) -> Result<Vec<String>> {
        let path = sdf::path(path)?;
        Ok(self.get(id)?.children(&path))
    }

    fn traverse(&self, id: &str) -> Result<Vec<Path>> {
        Ok(self.get(id)?.traverse())
    }

    fn attribute_names(&self, id: &str, path: &str) -> Result<Vec<String>> {
        let path = sdf::path(path)?;
        Ok(self.get(id)?.attribute_names(&path))
    }

    fn create_variant_set(&mut self, id: &str, path: &str, set: &str) -> Result<Outcome<bool>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer.create_variant_set(&path, set).map(Outcome::Applied)
    }

    fn get_variant_set(&self, id: &str, path: &str, set: &str) -> Result<Option<VariantSetHandle>> {
        let path = sdf::path(path)?;
        Ok(self
            .get(id)?
            .variant_set(&path, set)
            .map(|variants| VariantSetHandle::new(&path, set, variants)))
    }

    fn variant_set_names(&self, id: &str, path: &str) -> Result<Vec<String>> {
        let path = sdf::path(path)?;
        Ok(self.get(id)?.variant_set_names(&path))
    }

    fn add_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer.add_variant(&path, set, variant).map(Outcome::Applied)
    }

    fn select_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer.select_variant(&path, set, variant).map(Outcome::Applied)
    }

    fn edit_variant(
        &mut self,
        id: &str,
        path: &str,
        set: &str,
        variant: &str,
        block: &mut EditBlock<'_>,
    ) -> Result<Outcome<()>> {
        let path = sdf::path(path)?;
        let layer = self.get_mut(id)?;
        layer
            .edit_variant(&path, set, variant, |editor| block(editor))
            .map(Outcome::Applied)
    }

    fn compose(&mut self, base: &str, overlays: &[&str], output: &str) -> Result<Outcome<ComposedLayer>> {
        let output = LayerId::new(output)?;
        let base = self.input(base)?;
        let overlays = overlays
            .iter()
            .map(|id| self.input(id))
            .collect::<Result<Vec<_>>>()?;

        let composed = composition::compose(base, &overlays, output.clone());
        info!(
            output = %output,
            inputs = composed.composed_layers.len(),
            prims = composed.layer.traverse().len(),
            "composed layers"
        );

        self.layers.insert(output, composed.layer.clone());
        Ok(Outcome::Applied(composed))
    }

    fn flatten(&mut self, id: &str, output: &str) -> Result<Outcome<Layer>> {
        let output = LayerId::new(output)?;
        let flattened = composition::flatten(self.get(id)?, output.clone());

        info!(layer = id, output = %output, "flattened layer");
        self.layers.insert(output, flattened.clone());
        Ok(Outcome::Applied(flattened))
    }
}
