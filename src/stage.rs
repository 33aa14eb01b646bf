//! The public stage API.
//!
//! Every top-level call probes the gate once and runs entirely against the
//! backend that answer selects.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::anyhow;
use tracing::trace;

use crate::backend::{Backend, NullBackend, Outcome, RealBackend};
use crate::composition::ComposedLayer;
use crate::error::{Error, Result};
use crate::gate::{EnvProbe, FixedProbe, Mode, Probe};
use crate::layer::{Layer, LayerId, VariantEditor, VariantSetHandle};
use crate::sdf::{Datum, Encoded, Path, Value, ValueKind};
use crate::storage::{FileStorage, LayerStorage, MemoryStorage};

/// Environment variable naming the [`FileStorage`] root used by [`Stage::from_env`].
pub const ROOT_ENV: &str = "OPENUSD_STAGE_ROOT";

/// Builder for [`Stage`].
///
/// Defaults to in-memory storage with the gate fixed at [`Mode::Available`].
#[derive(Default)]
pub struct StageOptions {
    storage: Option<Arc<dyn LayerStorage>>,
    probe: Option<Box<dyn Probe>>,
}

impl StageOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn storage(mut self, storage: Arc<dyn LayerStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Persist layers as `.usda` files beneath `root`.
    pub fn root(self, root: impl Into<PathBuf>) -> Self {
        self.storage(Arc::new(FileStorage::new(root)))
    }

    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probe = Some(Box::new(probe));
        self
    }

    /// Fix the gate at `mode`.
    pub fn mode(self, mode: Mode) -> Self {
        self.probe(FixedProbe(mode))
    }

    pub fn build(self) -> Stage {
        let storage = self.storage.unwrap_or_else(|| Arc::new(MemoryStorage::new()));
        let probe = self.probe.unwrap_or_else(|| Box::new(FixedProbe(Mode::Available)));
        Stage {
            real: RealBackend::new(storage),
            null: NullBackend,
            probe,
        }
    }
}

/// A set of open layer documents.
pub struct Stage {
    real: RealBackend,
    null: NullBackend,
    probe: Box<dyn Probe>,
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage").field("real", &self.real).finish_non_exhaustive()
    }
}

impl Stage {
    /// In-memory stage, always available.
    pub fn new() -> Self {
        StageOptions::new().build()
    }

    pub fn builder() -> StageOptions {
        StageOptions::new()
    }

    /// Stage configured from the environment: [`ROOT_ENV`] selects a
    /// directory of `.usda` files (in-memory storage if unset) and the gate
    /// follows [`crate::gate::MODE_ENV`].
    pub fn from_env() -> Self {
        let options = StageOptions::new().probe(EnvProbe);
        let options = match std::env::var_os(ROOT_ENV) {
            Some(root) if !root.is_empty() => options.root(root),
            _ => options,
        };
        options.build()
    }

    /// The gate's current answer.
    pub fn mode(&self) -> Mode {
        self.probe.probe()
    }

    fn backend(&mut self) -> &mut dyn Backend {
        let mode = self.probe.probe();
        trace!(?mode, "dispatch");
        match mode {
            Mode::Available => &mut self.real,
            Mode::Degraded => &mut self.null,
        }
    }

    fn reader(&self) -> &dyn Backend {
        match self.probe.probe() {
            Mode::Available => &self.real,
            Mode::Degraded => &self.null,
        }
    }

    // Document lifecycle.

    /// Create an empty, open layer. Fails if `id` is already open.
    pub fn create_new(&mut self, id: &str) -> Result<Outcome<()>> {
        self.backend().create_new(id)
    }

    /// Load a persisted layer. An already open layer is left as is.
    pub fn open(&mut self, id: &str) -> Result<Outcome<()>> {
        self.backend().open(id)
    }

    /// Drop a layer without saving it.
    pub fn close(&mut self, id: &str) -> Result<Outcome<()>> {
        self.backend().close(id)
    }

    pub fn is_open(&self, id: &str) -> bool {
        self.reader().is_open(id)
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.reader().is_dirty(id)
    }

    /// Persist a layer under its own identifier and mark it clean.
    pub fn save(&mut self, id: &str) -> Result<Outcome<()>> {
        self.backend().save(id)
    }

    /// Persist a layer's current state under `new_id`. The source keeps its
    /// identifier and dirty flag.
    pub fn export(&mut self, id: &str, new_id: &str) -> Result<Outcome<()>> {
        self.backend().export(id, new_id)
    }

    pub fn list_persisted(&self) -> Result<Vec<LayerId>> {
        self.reader().list_persisted()
    }

    pub fn layer(&self, id: &str) -> Option<&Layer> {
        self.reader().layer(id)
    }

    // Prims and attributes.

    /// Create `path` and any missing ancestors, or retype an existing prim.
    pub fn define_prim(&mut self, id: &str, path: &str, type_name: &str) -> Result<Outcome<Path>> {
        self.backend().define_prim(id, path, type_name)
    }

    /// Remove a prim and its subtree. A missing prim is not an error.
    pub fn remove_prim(&mut self, id: &str, path: &str) -> Result<Outcome<bool>> {
        self.backend().remove_prim(id, path)
    }

    /// Encode `value` as `kind` and store it, replacing any previous value and kind.
    pub fn set_attribute(
        &mut self,
        id: &str,
        path: &str,
        name: &str,
        kind: &str,
        value: impl Into<Datum>,
    ) -> Result<Outcome<Encoded>> {
        let value = value.into();
        self.backend().set_attribute(id, path, name, kind, &value)
    }

    pub fn remove_attribute(&mut self, id: &str, path: &str, name: &str) -> Result<Outcome<bool>> {
        self.backend().remove_attribute(id, path, name)
    }

    pub fn get_attribute(&self, id: &str, path: &str, name: &str) -> Option<(ValueKind, Value)> {
        self.reader().get_attribute(id, path, name)
    }

    pub fn prim_exists(&self, id: &str, path: &str) -> bool {
        self.reader().prim_exists(id, path)
    }

    pub fn prim_type(&self, id: &str, path: &str) -> Result<Option<String>> {
        self.reader().prim_type(id, path)
    }

    pub fn children(&self, id: &str, path: &str) -> Result<Vec<String>> {
        self.reader().children(id, path)
    }

    pub fn traverse(&self, id: &str) -> Result<Vec<Path>> {
        self.reader().traverse(id)
    }

    pub fn attribute_names(&self, id: &str, path: &str) -> Result<Vec<String>> {
        self.reader().attribute_names(id, path)
    }

    // Variants.

    pub fn create_variant_set(&mut self, id: &str, path: &str, set: &str) -> Result<Outcome<bool>> {
        self.backend().create_variant_set(id, path, set)
    }

    pub fn get_variant_set(&self, id: &str, path: &str, set: &str) -> Result<Option<VariantSetHandle>> {
        self.reader().get_variant_set(id, path, set)
    }

    pub fn variant_set_names(&self, id: &str, path: &str) -> Result<Vec<String>> {
        self.reader().variant_set_names(id, path)
    }

    pub fn add_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>> {
        self.backend().add_variant(id, path, set, variant)
    }

    pub fn select_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>> {
        self.backend().select_variant(id, path, set, variant)
    }

    /// Run `block` with its writes redirected into the overlay of
    /// `set`=`variant` on `path`.
    ///
    /// If `block` fails, the overlay is restored and the error is returned.
    /// In degraded mode `block` is not run.
    pub fn with_variant_edit_context<R>(
        &mut self,
        id: &str,
        path: &str,
        set: &str,
        variant: &str,
        block: impl FnOnce(&mut VariantEditor<'_>) -> Result<R>,
    ) -> Result<Outcome<R>> {
        let mut block = Some(block);
        let mut output = None;

        let outcome = self.backend().edit_variant(id, path, set, variant, &mut |editor| {
            if let Some(block) = block.take() {
                output = Some(block(editor)?);
            }
            Ok(())
        })?;

        match (outcome, output) {
            (Outcome::Applied(()), Some(value)) => Ok(Outcome::Applied(value)),
            (Outcome::Applied(()), None) => Err(Error::Storage(anyhow!("Variant edit block was not run"))),
            (Outcome::Acknowledged(message), _) => Ok(Outcome::Acknowledged(message)),
        }
    }

    // Composition.

    /// Merge `base` and `overlays` (weakest first) into a new open layer `output`.
    pub fn compose(&mut self, base: &str, overlays: &[&str], output: &str) -> Result<Outcome<ComposedLayer>> {
        self.backend().compose(base, overlays, output)
    }

    /// Bake the selected variants of `id` into a new open layer `output`.
    pub fn flatten(&mut self, id: &str, output: &str) -> Result<Outcome<Layer>> {
        self.backend().flatten(id, output)
    }
}
