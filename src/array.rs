use std::fmt::Display;

use serde::{Serialize, Serializer};

use crate::{structure::TraversalError, value::Value};

/// A dense n-dimensional array stored in row major order.
///
/// Along axis 0 an array of rank `r >= 2` is a sequence of rank `r - 1` sub-arrays, a rank 1
/// array is a sequence of its scalars, and a rank 0 array is a single opaque unit.
#[derive(Debug, Clone, PartialEq)]
pub struct DenseArray {
    shape: Vec<usize>,
    data: Vec<Value>,
}

impl DenseArray {
    /// # Errors
    ///
    /// `InvalidShape` if the data does not fill the shape exactly
    pub fn new(shape: Vec<usize>, data: Vec<Value>) -> Result<Self, TraversalError> {
        let size: usize = shape.iter().product();
        if size != data.len() {
            return Err(TraversalError::InvalidShape {
                shape,
                len: data.len(),
            });
        }
        Ok(DenseArray { shape, data })
    }

    /// `0..product(shape)` laid out in the given shape
    pub fn arange(shape: &[usize]) -> Self {
        let size: usize = shape.iter().product();
        DenseArray {
            shape: shape.to_vec(),
            data: (0..size).map(Value::from).collect(),
        }
    }

    pub fn scalar(value: impl Into<Value>) -> Self {
        DenseArray {
            shape: vec![],
            data: vec![value.into()],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[Value] {
        &self.data
    }

    /// The `i`-th element along axis 0
    pub fn subarray(&self, i: usize) -> Option<Value> {
        match self.shape.split_first() {
            None => None,
            Some((&len, _)) if i >= len => None,
            Some((_, [])) => self.data.get(i).cloned(),
            Some((_, rest)) => {
                let stride: usize = rest.iter().product();
                Some(Value::Array(DenseArray {
                    shape: rest.to_vec(),
                    data: self.data[i * stride..(i + 1) * stride].to_vec(),
                }))
            }
        }
    }

    /// All elements along axis 0, `None` for a rank 0 array
    pub fn elements(&self) -> Option<Vec<Value>> {
        let len = *self.shape.first()?;
        Some((0..len).filter_map(|i| self.subarray(i)).collect())
    }

    /// The array as nested lists
    pub fn to_nested(&self) -> Value {
        match self.elements() {
            None => self.data.first().cloned().unwrap_or_default(),
            Some(elements) => Value::List(
                elements
                    .into_iter()
                    .map(|e| match e {
                        Value::Array(a) => a.to_nested(),
                        other => other,
                    })
                    .collect(),
            ),
        }
    }
}

impl Display for DenseArray {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_nested())
    }
}

impl Serialize for DenseArray {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_nested().serialize(serializer)
    }
}
