//! `openusd_stage` is a layered scene-description store in the USD mold.
//!
//! # Modules
//!
//! - `sdf` - Paths and the typed value codec
//! - `layer` - Documents: prim trees, attributes and variant sets
//! - `composition` - Strength-ordered merging of layers
//! - `usda` - Text format (.usda) reader and writer
//! - `storage` - Where layers are persisted
//! - `gate` - Execution-mode probes
//! - `backend` - Real and degraded execution of stage operations
//! - `stage` - The public entry point

pub mod backend;
pub mod composition;
pub mod error;
pub mod gate;
pub mod layer;
pub mod sdf;
pub mod stage;
pub mod storage;
pub mod usda;

pub use backend::Outcome;
pub use error::{Error, ErrorKind, Result};
pub use gate::Mode;
pub use layer::{Layer, LayerId, VariantEditor, VariantSetHandle};
pub use sdf::{Datum, Value, ValueKind};
pub use stage::{Stage, StageOptions};
