//! Concrete operand values as seen by the dispatcher.

use std::{
    fmt,
    hash::{Hash, Hasher},
};

use strum::{Display, EnumIter, EnumString};

/// Identity of a heap object, as handed out by the host runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(pub u64);

/// The primitive kind of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    /// 32-bit signed integer
    Int,
    /// 64-bit signed integer
    Long,
    /// 32-bit IEEE float
    Float,
    /// 64-bit IEEE float
    Double,
    /// Object reference
    Reference,
}

/// A concrete comparison operand.
///
/// Equality and hashing are bit-exact: `NaN` equals itself and `-0.0` differs from `0.0`.
/// This makes `Value` usable as the key of value-to-tag maps.
#[derive(Debug, Clone, Copy)]
pub enum Value {
    /// `int` operand
    Int(i32),
    /// `long` operand
    Long(i64),
    /// `float` operand
    Float(f32),
    /// `double` operand
    Double(f64),
    /// Reference operand, `None` is `null`
    Reference(Option<ObjectId>),
}

impl Value {
    /// The kind of this value.
    #[must_use]
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Int(_) => ValueKind::Int,
            Value::Long(_) => ValueKind::Long,
            Value::Float(_) => ValueKind::Float,
            Value::Double(_) => ValueKind::Double,
            Value::Reference(_) => ValueKind::Reference,
        }
    }

    /// Numeric value widened to `f64`, `None` for references.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(f64::from(*v)),
            Value::Long(v) => Some(*v as f64),
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::Reference(_) => None,
        }
    }

    /// Returns true for `int` and `long` values.
    #[must_use]
    pub fn is_integral(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Long(_))
    }

    fn bits(&self) -> u64 {
        match self {
            #[allow(clippy::cast_sign_loss)]
            Value::Int(v) => *v as u32 as u64,
            #[allow(clippy::cast_sign_loss)]
            Value::Long(v) => *v as u64,
            Value::Float(v) => u64::from(v.to_bits()),
            Value::Double(v) => v.to_bits(),
            Value::Reference(Some(id)) => id.0,
            Value::Reference(None) => 0,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Reference(a), Value::Reference(b)) => a == b,
            _ => self.kind() == other.kind() && self.bits() == other.bits(),
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        match self {
            Value::Reference(reference) => reference.hash(state),
            _ => self.bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::Reference(Some(id)) => write!(f, "@{:x}", id.0),
            Value::Reference(None) => write!(f, "null"),
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Long(value)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Double(value)
    }
}

impl From<Option<ObjectId>> for Value {
    fn from(value: Option<ObjectId>) -> Self {
        Value::Reference(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn equality_is_bit_exact() {
        assert_eq!(Value::Double(f64::NAN), Value::Double(f64::NAN));
        assert_ne!(Value::Double(0.0), Value::Double(-0.0));
        assert_ne!(Value::Int(5), Value::Long(5));
        assert_ne!(Value::Reference(None), Value::Reference(Some(ObjectId(0))));
        assert_eq!(
            Value::Reference(Some(ObjectId(7))),
            Value::Reference(Some(ObjectId(7)))
        );
    }

    #[test]
    fn usable_as_hash_key() {
        let mut set = HashSet::new();
        set.insert(Value::Double(12.0));
        set.insert(Value::Double(12.0));
        set.insert(Value::Float(12.0));

        assert_eq!(set.len(), 2);
        assert!(set.contains(&Value::Double(12.0)));
    }

    #[test]
    fn display_and_kind() {
        assert_eq!(Value::Double(12.0).to_string(), "12");
        assert_eq!(Value::Double(137.4).to_string(), "137.4");
        assert_eq!(Value::Reference(None).to_string(), "null");
        assert_eq!(Value::Reference(Some(ObjectId(255))).to_string(), "@ff");
        assert_eq!(Value::Long(1).kind(), ValueKind::Long);
        assert_eq!(ValueKind::Double.to_string(), "double");
    }
}
