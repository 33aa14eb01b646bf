//! Attribute value kinds and the typed value codec.
//!
//! [`Value`] is the closed set of payloads an attribute can hold. [`Datum`] is
//! the loosely-shaped value a caller hands in; [`encode`] checks it against a
//! kind tag and produces a [`Value`], [`decode`] turns it back.
//!
//! Unknown kind tags do not fail: the datum's textual form is stored as a
//! `string` and the result is marked [`Encoded::lossy`]. That path is one-way.

use std::fmt;

use crate::error::{Error, Result};

/// The fixed set of attribute value kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Int,
    Float,
    IntArray,
    FloatArray,
    Vec3fArray,
}

impl ValueKind {
    pub const ALL: [ValueKind; 6] = [
        ValueKind::String,
        ValueKind::Int,
        ValueKind::Float,
        ValueKind::IntArray,
        ValueKind::FloatArray,
        ValueKind::Vec3fArray,
    ];

    /// Resolve a kind tag. Accepts the canonical names and their USDA spellings.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let kind = match tag {
            "string" | "token" => ValueKind::String,
            "int" | "int64" => ValueKind::Int,
            "float" | "double" => ValueKind::Float,
            "int_array" | "int[]" | "int64[]" => ValueKind::IntArray,
            "float_array" | "float[]" | "double[]" => ValueKind::FloatArray,
            "vec3f_array" | "float3[]" | "point3f[]" | "normal3f[]" | "vector3f[]" | "color3f[]" => {
                ValueKind::Vec3fArray
            }
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Float => "float",
            ValueKind::IntArray => "int_array",
            ValueKind::FloatArray => "float_array",
            ValueKind::Vec3fArray => "vec3f_array",
        }
    }

    /// Type name used in `.usda` text.
    pub fn usda_type(&self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int64",
            ValueKind::Float => "double",
            ValueKind::IntArray => "int64[]",
            ValueKind::FloatArray => "double[]",
            ValueKind::Vec3fArray => "float3[]",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A typed attribute payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Int(i64),
    Float(f64),
    IntArray(Vec<i64>),
    FloatArray(Vec<f64>),
    Vec3fArray(Vec<[f32; 3]>),
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::String(_) => ValueKind::String,
            Value::Int(_) => ValueKind::Int,
            Value::Float(_) => ValueKind::Float,
            Value::IntArray(_) => ValueKind::IntArray,
            Value::FloatArray(_) => ValueKind::FloatArray,
            Value::Vec3fArray(_) => ValueKind::Vec3fArray,
        }
    }

    pub fn try_as_string_ref(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn try_as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn try_as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<i64>> for Value {
    fn from(value: Vec<i64>) -> Self {
        Value::IntArray(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(value: Vec<f64>) -> Self {
        Value::FloatArray(value)
    }
}

impl From<Vec<[f32; 3]>> for Value {
    fn from(value: Vec<[f32; 3]>) -> Self {
        Value::Vec3fArray(value)
    }
}

/// A loosely-shaped value, as produced by importers and other callers that
/// do not know the attribute's kind statically.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Text(String),
    Integer(i64),
    Real(f64),
    Bool(bool),
    List(Vec<Datum>),
}

impl Datum {
    fn shape(&self) -> &'static str {
        match self {
            Datum::Text(_) => "text",
            Datum::Integer(_) => "integer",
            Datum::Real(_) => "real",
            Datum::Bool(_) => "bool",
            Datum::List(_) => "list",
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Datum::Integer(v) => Some(*v as f64),
            Datum::Real(v) => Some(*v),
            _ => None,
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Text(s) => f.write_str(s),
            Datum::Integer(v) => write!(f, "{v}"),
            Datum::Real(v) => write!(f, "{v}"),
            Datum::Bool(v) => write!(f, "{v}"),
            Datum::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<&str> for Datum {
    fn from(value: &str) -> Self {
        Datum::Text(value.to_owned())
    }
}

impl From<String> for Datum {
    fn from(value: String) -> Self {
        Datum::Text(value)
    }
}

impl From<i64> for Datum {
    fn from(value: i64) -> Self {
        Datum::Integer(value)
    }
}

impl From<f64> for Datum {
    fn from(value: f64) -> Self {
        Datum::Real(value)
    }
}

impl From<bool> for Datum {
    fn from(value: bool) -> Self {
        Datum::Bool(value)
    }
}

impl<T: Into<Datum>> From<Vec<T>> for Datum {
    fn from(value: Vec<T>) -> Self {
        Datum::List(value.into_iter().map(Into::into).collect())
    }
}

/// Result of [`encode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Encoded {
    pub value: Value,
    /// Set when the kind tag was unknown and the datum was stringified.
    /// Decoding such a value does not give back the original datum.
    pub lossy: bool,
}

impl Encoded {
    pub fn kind(&self) -> ValueKind {
        self.value.kind()
    }
}

/// Check `datum` against the kind named by `tag` and build the typed value.
pub fn encode(tag: &str, datum: &Datum) -> Result<Encoded> {
    let Some(kind) = ValueKind::from_tag(tag) else {
        return Ok(Encoded {
            value: Value::String(datum.to_string()),
            lossy: true,
        });
    };

    Ok(Encoded {
        value: encode_kind(kind, datum)?,
        lossy: false,
    })
}

/// [`encode`] for an already-resolved kind.
pub fn encode_kind(kind: ValueKind, datum: &Datum) -> Result<Value> {
    let mismatch = |what: &str| Error::unsupported(kind.as_str(), what.to_owned());

    let value = match (kind, datum) {
        (ValueKind::String, Datum::Text(s)) => Value::String(s.clone()),
        (ValueKind::Int, Datum::Integer(v)) => Value::Int(*v),
        (ValueKind::Float, Datum::Integer(_) | Datum::Real(_)) => Value::Float(datum.as_f64().unwrap_or_default()),
        (ValueKind::IntArray, Datum::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                match item {
                    Datum::Integer(v) => out.push(*v),
                    other => return Err(mismatch(&format!("element {index} is {}, want integer", other.shape()))),
                }
            }
            Value::IntArray(out)
        }
        (ValueKind::FloatArray, Datum::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                let v = item
                    .as_f64()
                    .ok_or_else(|| mismatch(&format!("element {index} is {}, want number", item.shape())))?;
                out.push(v);
            }
            Value::FloatArray(out)
        }
        (ValueKind::Vec3fArray, Datum::List(items)) => {
            let mut out = Vec::with_capacity(items.len());
            for (index, item) in items.iter().enumerate() {
                out.push(encode_vec3(item).map_err(|what| mismatch(&format!("element {index} {what}")))?);
            }
            Value::Vec3fArray(out)
        }
        (kind, other) => {
            return Err(mismatch(&format!("got {} for {}", other.shape(), kind.as_str())));
        }
    };

    Ok(value)
}

fn encode_vec3(item: &Datum) -> std::result::Result<[f32; 3], String> {
    let Datum::List(components) = item else {
        return Err(format!("is {}, want a 3-component list", item.shape()));
    };
    if components.len() != 3 {
        return Err(format!("has {} components, want 3", components.len()));
    }

    let mut out = [0.0_f32; 3];
    for (slot, component) in out.iter_mut().zip(components) {
        let wide = component
            .as_f64()
            .ok_or_else(|| format!("has a {} component, want number", component.shape()))?;
        let narrow = wide as f32;
        if wide.is_finite() && !narrow.is_finite() {
            return Err(format!("has component {wide:e}, out of range for a 32-bit float"));
        }
        *slot = narrow;
    }
    Ok(out)
}

/// Convert a typed value back to its loose form.
///
/// Fails with `UnsupportedValue` if `value` is not of `kind`.
pub fn decode(kind: ValueKind, value: &Value) -> Result<Datum> {
    if value.kind() != kind {
        return Err(Error::unsupported(
            kind.as_str(),
            format!("value is of kind {}", value.kind()),
        ));
    }

    let datum = match value {
        Value::String(s) => Datum::Text(s.clone()),
        Value::Int(v) => Datum::Integer(*v),
        Value::Float(v) => Datum::Real(*v),
        Value::IntArray(items) => Datum::List(items.iter().copied().map(Datum::Integer).collect()),
        Value::FloatArray(items) => Datum::List(items.iter().copied().map(Datum::Real).collect()),
        Value::Vec3fArray(items) => Datum::List(
            items
                .iter()
                .map(|v| Datum::List(v.iter().map(|c| Datum::Real(f64::from(*c))).collect()))
                .collect(),
        ),
    };

    Ok(datum)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    fn round_trip(tag: &str, datum: Datum) {
        let encoded = encode(tag, &datum).unwrap();
        assert!(!encoded.lossy);
        let decoded = decode(encoded.kind(), &encoded.value).unwrap();
        assert_eq!(decoded, datum, "round trip through {tag}");
    }

    #[test]
    fn canonical_values_round_trip() {
        round_trip("string", Datum::from("héllo"));
        round_trip("int", Datum::from(-42_i64));
        round_trip("float", Datum::from(0.1_f64));
        round_trip("int_array", Datum::from(vec![1_i64, 2, 3]));
        round_trip("float_array", Datum::from(vec![0.5_f64, -1.25]));
        round_trip(
            "vec3f_array",
            Datum::List(vec![Datum::from(vec![0.0_f64, 1.5, -2.0]), Datum::from(vec![3.0_f64, 4.0, 5.0])]),
        );
        round_trip("int_array", Datum::List(vec![]));
    }

    #[test]
    fn usda_spellings_resolve() {
        assert_eq!(ValueKind::from_tag("point3f[]"), Some(ValueKind::Vec3fArray));
        assert_eq!(ValueKind::from_tag("int64"), Some(ValueKind::Int));
        assert_eq!(ValueKind::from_tag("double[]"), Some(ValueKind::FloatArray));
        for kind in ValueKind::ALL {
            assert_eq!(ValueKind::from_tag(kind.as_str()), Some(kind));
            assert_eq!(ValueKind::from_tag(kind.usda_type()), Some(kind));
        }
    }

    #[test]
    fn shape_mismatch_is_rejected() {
        let err = encode("int", &Datum::from("5")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let err = encode("int", &Datum::from(5.0_f64)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);

        let err = encode("int_array", &Datum::List(vec![Datum::from(1_i64), Datum::from("x")])).unwrap_err();
        assert!(err.to_string().contains("element 1"), "{err}");
    }

    #[test]
    fn vec3_requires_three_numeric_components() {
        let short = Datum::List(vec![Datum::from(vec![1.0_f64, 2.0])]);
        assert_eq!(encode("vec3f_array", &short).unwrap_err().kind(), ErrorKind::UnsupportedValue);

        let texty = Datum::List(vec![Datum::List(vec![1.0_f64.into(), "y".into(), 3.0_f64.into()])]);
        assert_eq!(encode("vec3f_array", &texty).unwrap_err().kind(), ErrorKind::UnsupportedValue);

        let flat = Datum::from(vec![1.0_f64, 2.0, 3.0]);
        assert_eq!(encode("vec3f_array", &flat).unwrap_err().kind(), ErrorKind::UnsupportedValue);
    }

    #[test]
    fn vec3_rejects_components_beyond_f32_range() {
        let huge = Datum::List(vec![Datum::from(vec![1e40_f64, 0.0, 0.0])]);
        let err = encode("vec3f_array", &huge).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
        assert!(err.to_string().contains("32-bit"), "{err}");

        let tiny = Datum::List(vec![Datum::from(vec![-1e40_f64, 0.0, 0.0])]);
        assert_eq!(encode("vec3f_array", &tiny).unwrap_err().kind(), ErrorKind::UnsupportedValue);

        // Explicit non-finite input is still representable.
        let inf = Datum::List(vec![Datum::from(vec![f64::INFINITY, 0.0, 1.5])]);
        let encoded = encode("vec3f_array", &inf).unwrap();
        assert_eq!(encoded.value, Value::Vec3fArray(vec![[f32::INFINITY, 0.0, 1.5]]));
    }

    #[test]
    fn float_kinds_widen_integers() {
        let encoded = encode("float", &Datum::from(3_i64)).unwrap();
        assert_eq!(encoded.value, Value::Float(3.0));

        let encoded = encode("float_array", &Datum::List(vec![1_i64.into(), 2.5_f64.into()])).unwrap();
        assert_eq!(encoded.value, Value::FloatArray(vec![1.0, 2.5]));
    }

    #[test]
    fn unknown_kind_falls_back_to_lossy_string() {
        let encoded = encode("matrix4d", &Datum::from(vec![1_i64, 2])).unwrap();
        assert!(encoded.lossy);
        assert_eq!(encoded.value, Value::String("[1, 2]".to_owned()));

        let decoded = decode(encoded.kind(), &encoded.value).unwrap();
        assert_ne!(decoded, Datum::from(vec![1_i64, 2]));
    }

    #[test]
    fn decode_checks_kind() {
        let err = decode(ValueKind::Int, &Value::Float(1.0)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnsupportedValue);
    }
}
