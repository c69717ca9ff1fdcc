use derive_more::Display;
use serde::Serialize;

use crate::value::{HostValue, Key, Value};

/// The semantic kind of a value, without its contents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize)]
pub enum Shape {
    Count,
    Sequence,
    Mapping,
    Countable,
    Opaque,
}

/// A classified value in the canonical form for its kind
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    /// A bare magnitude, iterated as `0..n`
    Count(usize),
    Sequence(Vec<Value>),
    /// Key/value pairs in their stable iteration order
    Mapping(Vec<(Key, Value)>),
    /// Listable, but neither positional nor keyed
    Countable(Vec<Value>),
    /// A single unit
    Opaque(Value),
}

impl ShapeKind {
    pub fn shape(&self) -> Shape {
        match self {
            ShapeKind::Count(_) => Shape::Count,
            ShapeKind::Sequence(_) => Shape::Sequence,
            ShapeKind::Mapping(_) => Shape::Mapping,
            ShapeKind::Countable(_) => Shape::Countable,
            ShapeKind::Opaque(_) => Shape::Opaque,
        }
    }

    /// Whether flattening can descend into this kind
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            ShapeKind::Sequence(_) | ShapeKind::Mapping(_) | ShapeKind::Countable(_)
        )
    }

    pub fn len(&self) -> usize {
        match self {
            ShapeKind::Count(n) => *n,
            ShapeKind::Sequence(v) | ShapeKind::Countable(v) => v.len(),
            ShapeKind::Mapping(m) => m.len(),
            ShapeKind::Opaque(_) => 1,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The individually addressable elements: `0..n` for a count, one single-entry mapping per
    /// entry, the elements of a sequence, or the value itself for an opaque unit.
    pub fn into_elements(self) -> Vec<Value> {
        match self {
            ShapeKind::Count(n) => (0..n).map(Value::from).collect(),
            ShapeKind::Sequence(v) | ShapeKind::Countable(v) => v,
            ShapeKind::Mapping(m) => m.into_iter().map(|(k, v)| Value::entry(k, v)).collect(),
            ShapeKind::Opaque(v) => vec![v],
        }
    }

    /// The values one level down (the values of a mapping), `None` for leaves
    pub fn into_children(self) -> Option<Vec<Value>> {
        match self {
            ShapeKind::Sequence(v) | ShapeKind::Countable(v) => Some(v),
            ShapeKind::Mapping(m) => Some(m.into_iter().map(|(_, v)| v).collect()),
            ShapeKind::Count(_) | ShapeKind::Opaque(_) => None,
        }
    }
}

/// Truncates toward zero; negative magnitudes give an empty count.
fn count_of(magnitude: f64) -> Option<usize> {
    if !magnitude.is_finite() {
        return None;
    }
    let truncated = magnitude.trunc();
    if truncated <= 0.0 {
        Some(0)
    } else {
        Some(truncated as usize)
    }
}

fn classify_host(host: &dyn HostValue, value: &Value) -> ShapeKind {
    match (host.magnitude(), host.entries(), host.elements()) {
        (Some(m), None, None) => match count_of(m) {
            Some(n) => ShapeKind::Count(n),
            None => ShapeKind::Opaque(value.clone()),
        },
        (None, Some(entries), None) => ShapeKind::Mapping(entries),
        (None, None, Some(elements)) => ShapeKind::Sequence(elements),
        (_, entries, elements) => {
            let listed = host.items().or(elements).or_else(|| {
                entries.map(|e| e.into_iter().map(|(k, _)| Value::from(k)).collect())
            });
            match listed {
                Some(items) => ShapeKind::Countable(items),
                None => ShapeKind::Opaque(value.clone()),
            }
        }
    }
}

/// The magnitude of a value that classifies as a count, read without expanding it to `0..n`
pub fn count_hint(value: &Value) -> Option<usize> {
    match value {
        Value::Int(n) => Some(usize::try_from(*n).unwrap_or(0)),
        Value::Float(x) => count_of(*x),
        Value::Host(h) => match (h.magnitude(), h.entries(), h.elements()) {
            (Some(m), None, None) => count_of(m),
            _ => None,
        },
        _ => None,
    }
}

/// Classifies a value into exactly one kind. Never fails: anything unrecognised is an opaque unit.
pub fn classify(value: &Value) -> ShapeKind {
    match value {
        Value::Int(_) | Value::Float(_) => match count_hint(value) {
            Some(n) => ShapeKind::Count(n),
            None => ShapeKind::Opaque(value.clone()),
        },
        Value::Map(m) => {
            ShapeKind::Mapping(m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        }
        Value::List(v) | Value::Tuple(v) => ShapeKind::Sequence(v.clone()),
        Value::Text(s) => ShapeKind::Sequence(s.chars().map(Value::Char).collect()),
        Value::Array(a) => match a.elements() {
            Some(elements) => ShapeKind::Sequence(elements),
            None => ShapeKind::Opaque(value.clone()),
        },
        Value::Set(s) => ShapeKind::Countable(s.iter().cloned().map(Value::from).collect()),
        Value::Host(h) => classify_host(h.as_ref(), value),
        Value::Unit | Value::Bool(_) | Value::Char(_) => ShapeKind::Opaque(value.clone()),
    }
}
