//! Storage backends behind the stage.
//!
//! [`RealBackend`] owns the open documents and persists them through a
//! [`LayerStorage`](crate::storage::LayerStorage). [`NullBackend`] is used
//! while the gate reports [`Mode::Degraded`](crate::gate::Mode): it performs
//! no work and answers every mutation with an acknowledgment.
//!
//! Arguments arrive as raw strings so that each backend decides how much to
//! validate; the null backend validates nothing and never fails.

mod null;
mod real;

use crate::composition::ComposedLayer;
use crate::error::Result;
use crate::layer::{Layer, LayerId, VariantEditor, VariantSetHandle};
use crate::sdf::{Datum, Encoded, Path, Value, ValueKind};

pub use null::NullBackend;
pub use real::RealBackend;

/// Result of a mutating operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The operation ran and produced `T`.
    Applied(T),
    /// Nothing was done; the message describes what would have happened.
    Acknowledged(String),
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }

    pub fn is_acknowledged(&self) -> bool {
        matches!(self, Outcome::Acknowledged(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Outcome::Applied(value) => Some(value),
            Outcome::Acknowledged(_) => None,
        }
    }

    pub fn acknowledgment(&self) -> Option<&str> {
        match self {
            Outcome::Applied(_) => None,
            Outcome::Acknowledged(message) => Some(message),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Applied(value) => Outcome::Applied(f(value)),
            Outcome::Acknowledged(message) => Outcome::Acknowledged(message),
        }
    }
}

/// Block run inside a variant edit context.
pub type EditBlock<'b> = dyn FnMut(&mut VariantEditor<'_>) -> Result<()> + 'b;

/// Every document, variant and composition operation of the stage.
pub trait Backend {
    fn name(&self) -> &'static str;

    // Document lifecycle.

    fn create_new(&mut self, id: &str) -> Result<Outcome<()>>;
    fn open(&mut self, id: &str) -> Result<Outcome<()>>;
    fn close(&mut self, id: &str) -> Result<Outcome<()>>;
    fn is_open(&self, id: &str) -> bool;
    fn is_dirty(&self, id: &str) -> bool;
    fn save(&mut self, id: &str) -> Result<Outcome<()>>;
    fn export(&mut self, id: &str, new_id: &str) -> Result<Outcome<()>>;
    fn list_persisted(&self) -> Result<Vec<LayerId>>;
    fn layer(&self, id: &str) -> Option<&Layer>;

    // Prims and attributes.

    fn define_prim(&mut self, id: &str, path: &str, type_name: &str) -> Result<Outcome<Path>>;
    fn remove_prim(&mut self, id: &str, path: &str) -> Result<Outcome<bool>>;
    fn set_attribute(&mut self, id: &str, path: &str, name: &str, kind: &str, value: &Datum)
        -> Result<Outcome<Encoded>>;
    fn remove_attribute(&mut self, id: &str, path: &str, name: &str) -> Result<Outcome<bool>>;
    fn get_attribute(&self, id: &str, path: &str, name: &str) -> Option<(ValueKind, Value)>;
    fn prim_exists(&self, id: &str, path: &str) -> bool;
    fn prim_type(&self, id: &str, path: &str) -> Result<Option<String>>;
    fn children(&self, id: &str, path: &str) -> Result<Vec<String>>;
    fn traverse(&self, id: &str) -> Result<Vec<Path>>;
    fn attribute_names(&self, id: &str, path: &str) -> Result<Vec<String>>;

    // Variants.

    fn create_variant_set(&mut self, id: &str, path: &str, set: &str) -> Result<Outcome<bool>>;
    fn get_variant_set(&self, id: &str, path: &str, set: &str) -> Result<Option<VariantSetHandle>>;
    fn variant_set_names(&self, id: &str, path: &str) -> Result<Vec<String>>;
    fn add_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>>;
    fn select_variant(&mut self, id: &str, path: &str, set: &str, variant: &str) -> Result<Outcome<()>>;
    fn edit_variant(
        &mut self,
        id: &str,
        path: &str,
        set: &str,
        variant: &str,
        block: &mut EditBlock<'_>,
    ) -> Result<Outcome<()>>;

    // Composition.

    fn compose(&mut self, base: &str, overlays: &[&str], output: &str) -> Result<Outcome<ComposedLayer>>;
    fn flatten(&mut self, id: &str, output: &str) -> Result<Outcome<Layer>>;
}
