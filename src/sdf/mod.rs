//! Scene description foundations: paths and typed values.

pub mod path;
pub mod value;

pub use path::{is_identifier, is_property_name, path, Path};
pub use value::{decode, encode, encode_kind, Datum, Encoded, Value, ValueKind};
