//! Host-side value representation and key classification.
//!
//! [`Value`] is the interchange type the converters produce and consume:
//! scalars are carried by value, objects as an owning wrapper over their
//! engine cell. [`Key`] is the tagged result of classifying a host-supplied
//! index, shared by every accessor operation.

use core::fmt;

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::engine::Engine;
use crate::error::BridgeError;
use crate::object::ObjectRef;

/// A host-side view of an engine value.
///
/// Scalars cross the boundary by value. `Object` retains an owned handle to
/// its cell for the wrapper's whole lifetime, so a `Value` is self-contained:
/// dropping it releases whatever it holds.
pub enum Value<'e, E: Engine + ?Sized> {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Object(ObjectRef<'e, E>),
}

impl<'e, E: Engine + ?Sized> Value<'e, E> {
    /// Host-facing name of this value's type, as used in usage-error
    /// messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef<'e, E>> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// Build a scalar value from its JSON form.
    ///
    /// Arrays and objects are refused: nested structure only exists as
    /// engine cells, and fabricating those is the host converters' job.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, BridgeError> {
        match json {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Value::Int(i))
                } else if let Some(x) = n.as_f64() {
                    Ok(Value::Float(x))
                } else {
                    Err(BridgeError::unconvertible("json number"))
                }
            }
            serde_json::Value::String(s) => Ok(Value::Str(s.clone())),
            serde_json::Value::Array(_) => Err(BridgeError::unconvertible("json array")),
            serde_json::Value::Object(_) => Err(BridgeError::unconvertible("json object")),
        }
    }

    /// Render a scalar value as JSON. Object wrappers are refused.
    pub fn to_json(&self) -> Result<serde_json::Value, BridgeError> {
        match self {
            Value::Null => Ok(serde_json::Value::Null),
            Value::Bool(b) => Ok(serde_json::Value::Bool(*b)),
            Value::Int(i) => Ok(serde_json::Value::from(*i)),
            Value::Float(x) => serde_json::Number::from_f64(*x)
                .map(serde_json::Value::Number)
                .ok_or_else(|| BridgeError::unconvertible("non-finite float")),
            Value::Str(s) => Ok(serde_json::Value::String(s.clone())),
            Value::Object(_) => Err(BridgeError::unconvertible("object")),
        }
    }
}

impl<'e, E: Engine + ?Sized> Default for Value<'e, E> {
    fn default() -> Self {
        Value::Null
    }
}

impl<'e, E: Engine + ?Sized> Clone for Value<'e, E> {
    fn clone(&self) -> Self {
        match self {
            Value::Null => Value::Null,
            Value::Bool(b) => Value::Bool(*b),
            Value::Int(i) => Value::Int(*i),
            Value::Float(x) => Value::Float(*x),
            Value::Str(s) => Value::Str(s.clone()),
            Value::Object(o) => Value::Object(o.clone()),
        }
    }
}

/// Scalars compare by value; objects by engine reference identity, matching
/// the identity-equality operation of the façade.
impl<'e, E: Engine + ?Sized> PartialEq for Value<'e, E> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.identical(b),
            _ => false,
        }
    }
}

impl<'e, E: Engine + ?Sized> fmt::Debug for Value<'e, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => f.debug_tuple("Bool").field(b).finish(),
            Value::Int(i) => f.debug_tuple("Int").field(i).finish(),
            Value::Float(x) => f.debug_tuple("Float").field(x).finish(),
            Value::Str(s) => f.debug_tuple("Str").field(s).finish(),
            Value::Object(o) => f.debug_tuple("Object").field(o).finish(),
        }
    }
}

impl<'e, E: Engine + ?Sized> Serialize for Value<'e, E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Object(_) => Err(S::Error::custom(
                "object cells are not serializable; convert through the host",
            )),
        }
    }
}

impl<'e, E: Engine + ?Sized> From<bool> for Value<'e, E> {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl<'e, E: Engine + ?Sized> From<i64> for Value<'e, E> {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl<'e, E: Engine + ?Sized> From<f64> for Value<'e, E> {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl<'e, E: Engine + ?Sized> From<&str> for Value<'e, E> {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl<'e, E: Engine + ?Sized> From<String> for Value<'e, E> {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl<'e, E: Engine + ?Sized> From<ObjectRef<'e, E>> for Value<'e, E> {
    fn from(o: ObjectRef<'e, E>) -> Self {
        Value::Object(o)
    }
}

/// A classified access key: either an array-style index or a property name.
///
/// Exactly one variant is meaningful per access. Classification happens
/// before any engine call, so an unsupported key fails without a gate
/// crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key<'k> {
    /// Array-element access.
    Index(u32),
    /// Property access by name.
    Name(&'k str),
}

impl<'k> Key<'k> {
    /// Classify a dynamic host value into an access mode.
    ///
    /// Non-negative integers select array-style access, strings select
    /// property access. Everything else is a usage error, including negative
    /// integers, which no engine index can name.
    pub fn classify<E: Engine + ?Sized>(value: &'k Value<'_, E>) -> Result<Self, BridgeError> {
        match value {
            Value::Int(i) => u32::try_from(*i)
                .map(Key::Index)
                .map_err(|_| BridgeError::unsupported_key("out-of-range integer")),
            Value::Str(s) => Ok(Key::Name(s)),
            other => Err(BridgeError::unsupported_key(other.type_name())),
        }
    }
}

impl From<u32> for Key<'_> {
    fn from(index: u32) -> Self {
        Key::Index(index)
    }
}

impl<'k> From<&'k str> for Key<'k> {
    fn from(name: &'k str) -> Self {
        Key::Name(name)
    }
}

impl TryFrom<i64> for Key<'_> {
    type Error = BridgeError;

    fn try_from(index: i64) -> Result<Self, BridgeError> {
        u32::try_from(index)
            .map(Key::Index)
            .map_err(|_| BridgeError::unsupported_key("out-of-range integer"))
    }
}

impl<'k, 'e, E: Engine + ?Sized> TryFrom<&'k Value<'e, E>> for Key<'k> {
    type Error = BridgeError;

    fn try_from(value: &'k Value<'e, E>) -> Result<Self, BridgeError> {
        Key::classify(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stub::StubEngine;

    type V = Value<'static, StubEngine>;

    #[test]
    fn classify_integer_keys() {
        assert_eq!(Key::classify(&V::Int(0)).unwrap(), Key::Index(0));
        assert_eq!(Key::classify(&V::Int(7)).unwrap(), Key::Index(7));
    }

    #[test]
    fn classify_name_keys() {
        let key = V::Str("width".into());
        assert_eq!(Key::classify(&key).unwrap(), Key::Name("width"));
    }

    #[test]
    fn classify_rejects_other_types() {
        assert!(Key::classify(&V::Null).is_err());
        assert!(Key::classify(&V::Bool(true)).is_err());
        assert!(Key::classify(&V::Float(1.5)).is_err());
    }

    #[test]
    fn classify_rejects_negative_integers() {
        let err = Key::classify(&V::Int(-1)).unwrap_err();
        assert!(matches!(err, BridgeError::UnsupportedKey { .. }));
    }

    #[test]
    fn usage_error_names_the_offending_type() {
        let err = Key::classify(&V::Bool(false)).unwrap_err();
        assert_eq!(
            err.to_string(),
            "expected non-negative integer or string for index, got boolean"
        );
    }

    #[test]
    fn json_scalar_round_trip() {
        for json in [
            serde_json::Value::Null,
            serde_json::json!(true),
            serde_json::json!(42),
            serde_json::json!(2.5),
            serde_json::json!("str"),
        ] {
            let value = V::from_json(&json).unwrap();
            assert_eq!(value.to_json().unwrap(), json);
        }
    }

    #[test]
    fn json_refuses_nested_structure() {
        assert!(V::from_json(&serde_json::json!([1, 2])).is_err());
        assert!(V::from_json(&serde_json::json!({"a": 1})).is_err());
    }

    #[test]
    fn scalar_accessors() {
        assert_eq!(V::Bool(true).as_bool(), Some(true));
        assert_eq!(V::Int(3).as_int(), Some(3));
        assert_eq!(V::Float(0.5).as_float(), Some(0.5));
        assert_eq!(V::Str("s".into()).as_str(), Some("s"));
        assert!(V::Null.is_null());
        assert_eq!(V::Int(3).as_bool(), None);
    }
}
