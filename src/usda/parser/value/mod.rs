pub mod arrays;
pub mod primitives;

use anyhow::Result;

use crate::sdf::{Value, ValueKind};

/// Value parsing dispatcher.
impl<'a> super::Parser<'a> {
    /// Decode a typed value for the declared attribute kind.
    pub(super) fn parse_value(&mut self, kind: ValueKind) -> Result<Value> {
        let value = match kind {
            ValueKind::String => Value::String(self.fetch_str()?),
            ValueKind::Int => Value::Int(self.parse_token()?),
            ValueKind::Float => Value::Float(self.parse_f64()?),
            ValueKind::IntArray => Value::IntArray(self.parse_array(|this| this.parse_token::<i64>())?),
            ValueKind::FloatArray => Value::FloatArray(self.parse_array(|this| this.parse_f64())?),
            ValueKind::Vec3fArray => Value::Vec3fArray(self.parse_array(|this| this.parse_vec3f())?),
        };

        Ok(value)
    }
}
