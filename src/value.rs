//! Dynamic values handed to and produced by a traversal
//!
//! [`Value`] is a closed union over everything a source (or an element of a source) can be.
//! Built-in variants each have exactly one shape; [`Value::Host`] wraps caller-defined values
//! that only advertise capabilities through [`HostValue`], and those are the only ones that
//! go through the ambiguity rules of [`crate::shape::classify`].

use std::{
    fmt::{Debug, Display},
    sync::Arc,
};

use derive_more::From;
use duplicate::duplicate;
use indexmap::{IndexMap, IndexSet};
use serde::{ser::SerializeMap, ser::SerializeSeq, Deserialize, Serialize, Serializer};

use crate::array::DenseArray;

/// The hashable subset of values, usable as mapping keys and set members
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From)]
#[serde(untagged)]
pub enum Key {
    Bool(bool),
    Int(i64),
    Char(char),
    Text(String),
}

impl From<&str> for Key {
    fn from(value: &str) -> Self {
        Key::Text(value.to_owned())
    }
}

impl From<Key> for Value {
    fn from(value: Key) -> Self {
        match value {
            Key::Bool(b) => Value::Bool(b),
            Key::Int(i) => Value::Int(i),
            Key::Char(c) => Value::Char(c),
            Key::Text(s) => Value::Text(s),
        }
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Bool(b) => write!(f, "{b}"),
            Key::Int(i) => write!(f, "{i}"),
            Key::Char(c) => write!(f, "{c:?}"),
            Key::Text(s) => write!(f, "{s:?}"),
        }
    }
}

/// Capabilities a caller-defined value can advertise.
///
/// Every probe defaults to "not supported". A value that answers exactly one of
/// [`Self::magnitude`], [`Self::entries`] and [`Self::elements`] is classified by that
/// answer; anything else falls back to [`Self::items`] (or whatever else it can list),
/// and finally to an opaque unit.
pub trait HostValue: Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// A pure magnitude, e.g. a numeric wrapper
    fn magnitude(&self) -> Option<f64> {
        None
    }

    /// Key/value access in a stable order
    fn entries(&self) -> Option<Vec<(Key, Value)>> {
        None
    }

    /// Positional, length-bounded access
    fn elements(&self) -> Option<Vec<Value>> {
        None
    }

    /// Plain iteration without positional or keyed semantics
    fn items(&self) -> Option<Vec<Value>> {
        None
    }
}

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Char(char),
    Text(String),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Map(IndexMap<Key, Value>),
    Set(IndexSet<Key>),
    Array(DenseArray),
    Host(Arc<dyn HostValue>),
}

impl Value {
    pub fn host<H: HostValue + 'static>(host: H) -> Self {
        Value::Host(Arc::new(host))
    }

    /// A one-entry mapping, the element form of a mapping source
    pub fn entry(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        let mut map = IndexMap::with_capacity(1);
        map.insert(key.into(), value.into());
        Value::Map(map)
    }

    pub fn pair(a: impl Into<Value>, b: impl Into<Value>) -> Self {
        Value::Tuple(vec![a.into(), b.into()])
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::List(v) | Value::Tuple(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&DenseArray> {
        match self {
            Value::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&IndexMap<Key, Value>> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) | (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

duplicate! {
    [int_type; [i8]; [i16]; [i32]; [i64]; [u8]; [u16]; [u32]]
    impl From<int_type> for Value {
        fn from(value: int_type) -> Self {
            Value::Int(i64::from(value))
        }
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<char> for Value {
    fn from(value: char) -> Self {
        Value::Char(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_owned())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Value::List(value.into_iter().map(Into::into).collect())
    }
}

impl From<IndexMap<Key, Value>> for Value {
    fn from(value: IndexMap<Key, Value>) -> Self {
        Value::Map(value)
    }
}

impl From<IndexSet<Key>> for Value {
    fn from(value: IndexSet<Key>) -> Self {
        Value::Set(value)
    }
}

impl From<DenseArray> for Value {
    fn from(value: DenseArray) -> Self {
        Value::Array(value)
    }
}

impl<K: Into<Key>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Value::Map(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Unit,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(a) => Value::List(a.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(o) => Value::Map(
                o.into_iter()
                    .map(|(k, v)| (Key::Text(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

fn write_joined<T: Display>(
    f: &mut std::fmt::Formatter<'_>,
    items: impl IntoIterator<Item = T>,
) -> std::fmt::Result {
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Text(s) => write!(f, "{s:?}"),
            Value::List(v) => {
                write!(f, "[")?;
                write_joined(f, v)?;
                write!(f, "]")
            }
            Value::Tuple(v) => {
                write!(f, "(")?;
                write_joined(f, v)?;
                if v.len() == 1 {
                    write!(f, ",")?;
                }
                write!(f, ")")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                write_joined(f, m.iter().map(|(k, v)| format!("{k}: {v}")))?;
                write!(f, "}}")
            }
            Value::Set(s) => {
                write!(f, "{{")?;
                write_joined(f, s)?;
                write!(f, "}}")
            }
            Value::Array(a) => write!(f, "{a}"),
            Value::Host(h) => write!(f, "<{}>", h.type_name()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Unit => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(x) => serializer.serialize_f64(*x),
            Value::Char(c) => serializer.serialize_char(*c),
            Value::Text(s) => serializer.serialize_str(s),
            Value::List(v) | Value::Tuple(v) => {
                let mut seq = serializer.serialize_seq(Some(v.len()))?;
                for item in v {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(m) => {
                let mut map = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Value::Set(s) => {
                let mut seq = serializer.serialize_seq(Some(s.len()))?;
                for item in s {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Array(a) => a.serialize(serializer),
            Value::Host(h) => serializer.serialize_str(h.type_name()),
        }
    }
}
