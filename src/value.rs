//! Dynamic attribute values.
//!
//! Values cross three seams: host reflection produces them, conversion
//! functions transform them, and the format codec packs them. Vector
//! components are carried as `f64` regardless of the declared format;
//! the codec decides the binary representation and rejects values that
//! do not fit it.

use smallvec::SmallVec;

/// Component storage for vector values. Inline up to 4 components,
/// which covers every format the presets use.
pub type Components = SmallVec<[f64; 4]>;

/// A dynamically typed attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Float(f64),
    Int(i64),
    Bool(bool),
    Vector(Components),
}

impl Value {
    /// Build a 2-component vector value.
    pub fn vec2(x: f64, y: f64) -> Self {
        Value::Vector(SmallVec::from_slice(&[x, y]))
    }

    /// Build a 3-component vector value.
    pub fn vec3(x: f64, y: f64, z: f64) -> Self {
        Value::Vector(SmallVec::from_slice(&[x, y, z]))
    }

    /// Build a 4-component vector value.
    pub fn vec4(x: f64, y: f64, z: f64, w: f64) -> Self {
        Value::Vector(SmallVec::from_slice(&[x, y, z, w]))
    }

    /// Scalar value as `f64`. `None` for vectors.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Vector(_) => None,
        }
    }

    /// Vector components. `None` for scalars.
    pub fn components(&self) -> Option<&[f64]> {
        match self {
            Value::Vector(c) => Some(c),
            _ => None,
        }
    }

    /// True if this value is a vector.
    pub fn is_vector(&self) -> bool {
        matches!(self, Value::Vector(_))
    }

    /// Convert a JSON value into a [`Value`].
    ///
    /// Numbers become [`Value::Int`] when integral, arrays of numbers
    /// become vectors. Anything else (strings, objects, nulls, nested
    /// arrays) has no attribute-value equivalent and yields `None`.
    pub fn from_json(json: &serde_json::Value) -> Option<Self> {
        match json {
            serde_json::Value::Bool(b) => Some(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Value::Int(i))
                } else {
                    n.as_f64().map(Value::Float)
                }
            }
            serde_json::Value::Array(items) => {
                let mut components = Components::new();
                for item in items {
                    components.push(item.as_f64()?);
                }
                Some(Value::Vector(components))
            }
            _ => None,
        }
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v as f64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<[f64; 2]> for Value {
    fn from(v: [f64; 2]) -> Self {
        Value::vec2(v[0], v[1])
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Value::vec3(v[0], v[1], v[2])
    }
}

impl From<[f64; 4]> for Value {
    fn from(v: [f64; 4]) -> Self {
        Value::vec4(v[0], v[1], v[2], v[3])
    }
}

impl From<&[f64]> for Value {
    fn from(v: &[f64]) -> Self {
        Value::Vector(SmallVec::from_slice(v))
    }
}
