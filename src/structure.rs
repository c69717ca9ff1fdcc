//! The iteration plan: per-source lengths, visiting order and the combined index space
//!
//! A [`Plan`] is built once per traversal from the flattened lengths of its sources. Malformed
//! order and depth requests never fail: they are replaced by the defaults ("first" order, depth
//! 0) and the replacement is recorded so callers can find out through [`Plan::used_fallback`].

use log::debug;
use num::Integer;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod concrete_index;

use crate::{iterators::PlanIndexIterator, permutation::Permutation};
use concrete_index::{ExpandedIndex, FlatIndex, Offset};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TraversalError {
    #[error("Index {index} out of range for {len} materialized values")]
    IndexOutOfRange { index: usize, len: usize },
    #[error("Point {point} out of range for an iteration space of size {total}")]
    PointOutOfRange { point: usize, total: usize },
    #[error("Mismatched arity: {got} offsets, vs {expected} dimensions")]
    OffsetArity { got: usize, expected: usize },
    #[error("Offset {offset} out of bounds for dimension {axis} of size {len}")]
    OffsetOutOfRange { axis: usize, offset: usize, len: usize },
    #[error("Iteration space of lengths {lengths:?} does not fit in usize")]
    SpaceTooLarge { lengths: Vec<usize> },
    #[error("Shape {shape:?} does not hold {len} elements")]
    InvalidShape { shape: Vec<usize>, len: usize },
    #[error("Source {source_index} has {got} elements, but the plan expects {expected}")]
    SourceLength {
        source_index: usize,
        got: usize,
        expected: usize,
    },
}

/// Which source varies fastest
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "OrderRepr", into = "OrderRepr")]
pub enum OrderSpec {
    /// Source 0 varies fastest
    #[default]
    First,
    /// The last source varies fastest
    Last,
    /// `order[0]` varies fastest, then `order[1]`, ...
    Explicit(Vec<usize>),
    /// A request that is neither a known name nor a list of indices; resolves like `First`
    Unrecognized(serde_json::Value),
}

#[derive(Deserialize, Serialize)]
#[serde(untagged)]
enum OrderRepr {
    Name(String),
    List(Vec<usize>),
    Other(serde_json::Value),
}

impl From<OrderRepr> for OrderSpec {
    fn from(value: OrderRepr) -> Self {
        match value {
            OrderRepr::Name(name) => match name.as_str() {
                "first" => OrderSpec::First,
                "last" => OrderSpec::Last,
                _ => OrderSpec::Unrecognized(serde_json::Value::String(name)),
            },
            OrderRepr::List(list) => OrderSpec::Explicit(list),
            OrderRepr::Other(other) => OrderSpec::Unrecognized(other),
        }
    }
}

impl From<OrderSpec> for OrderRepr {
    fn from(value: OrderSpec) -> Self {
        match value {
            OrderSpec::First => OrderRepr::Name("first".into()),
            OrderSpec::Last => OrderRepr::Name("last".into()),
            OrderSpec::Explicit(list) => OrderRepr::List(list),
            OrderSpec::Unrecognized(other) => OrderRepr::Other(other),
        }
    }
}

impl From<Vec<usize>> for OrderSpec {
    fn from(value: Vec<usize>) -> Self {
        OrderSpec::Explicit(value)
    }
}

impl OrderSpec {
    /// Resolves the request against `n` sources; the flag is set when it had to be replaced.
    pub fn resolve(&self, n: usize) -> (Permutation, bool) {
        match self {
            OrderSpec::First => (Permutation::id(n), false),
            OrderSpec::Last => (Permutation::reversed(n), false),
            OrderSpec::Explicit(list) => match Permutation::try_from_map(list, n) {
                Some(p) => (p, false),
                None => {
                    debug!("order {list:?} is not a permutation of 0..{n}, using ascending order");
                    (Permutation::id(n), true)
                }
            },
            OrderSpec::Unrecognized(other) => {
                debug!("unrecognized order {other}, using ascending order");
                (Permutation::id(n), true)
            }
        }
    }
}

/// How many nesting levels of each source are dissolved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepthSpec {
    Uniform(isize),
    PerSource(Vec<isize>),
    /// Anything else; resolves to depth 0 everywhere
    Unrecognized(serde_json::Value),
}

impl Default for DepthSpec {
    fn default() -> Self {
        DepthSpec::Uniform(0)
    }
}

impl From<isize> for DepthSpec {
    fn from(value: isize) -> Self {
        DepthSpec::Uniform(value)
    }
}

impl From<i32> for DepthSpec {
    fn from(value: i32) -> Self {
        DepthSpec::Uniform(isize::try_from(value).unwrap_or(0))
    }
}

impl From<Vec<isize>> for DepthSpec {
    fn from(value: Vec<isize>) -> Self {
        DepthSpec::PerSource(value)
    }
}

impl DepthSpec {
    /// One depth per source. Negative depths count as 0, and a list of the wrong length is
    /// replaced by depth 0 everywhere (the flag is set in that case).
    pub fn resolve(&self, n: usize) -> (Vec<usize>, bool) {
        let clamp = |d: isize| usize::try_from(d).unwrap_or(0);
        match self {
            DepthSpec::Uniform(d) => (vec![clamp(*d); n], false),
            DepthSpec::PerSource(list) if list.len() == n => {
                (list.iter().copied().map(clamp).collect(), false)
            }
            DepthSpec::PerSource(list) => {
                debug!(
                    "depth list of length {} does not match {n} sources, not flattening",
                    list.len()
                );
                (vec![0; n], true)
            }
            DepthSpec::Unrecognized(other) => {
                debug!("unrecognized depth {other}, not flattening");
                (vec![0; n], true)
            }
        }
    }
}

/// The resolved, read-only description of an iteration space
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    lengths: Vec<usize>,
    order: Permutation,
    strides: Vec<usize>,
    depths: Vec<usize>,
    total: usize,
    order_fallback: bool,
    depth_fallback: bool,
}

impl Plan {
    /// # Errors
    ///
    /// `SpaceTooLarge` if the product of the lengths overflows
    pub fn build(
        lengths: Vec<usize>,
        order: &OrderSpec,
        depth: &DepthSpec,
    ) -> Result<Self, TraversalError> {
        let n = lengths.len();
        let (order, order_fallback) = order.resolve(n);
        let (depths, depth_fallback) = depth.resolve(n);

        let total = if lengths.contains(&0) {
            0
        } else {
            lengths
                .iter()
                .try_fold(1usize, |acc, &l| acc.checked_mul(l))
                .ok_or_else(|| TraversalError::SpaceTooLarge {
                    lengths: lengths.clone(),
                })?
        };

        let mut strides = vec![1; n];
        let mut stride = 1usize;
        for &source in order.map() {
            strides[source] = stride;
            stride = stride.saturating_mul(lengths[source]);
        }

        debug!(
            "plan over lengths {lengths:?} with order {:?}: {total} points",
            order.map()
        );

        Ok(Plan {
            lengths,
            order,
            strides,
            depths,
            total,
            order_fallback,
            depth_fallback,
        })
    }

    pub fn lengths(&self) -> &[usize] {
        &self.lengths
    }

    /// `order()[0]` is the fastest varying source
    pub fn order(&self) -> &[usize] {
        self.order.map()
    }

    /// The inverse of [`Self::order`]: `order()[reverse_order()[i]] == i`
    pub fn reverse_order(&self) -> &[usize] {
        self.order.inv()
    }

    pub fn permutation(&self) -> &Permutation {
        &self.order
    }

    /// Distance in the counter between consecutive offsets of each source
    pub fn strides(&self) -> &[usize] {
        &self.strides
    }

    pub fn depths(&self) -> &[usize] {
        &self.depths
    }

    /// Product of all lengths, 1 for no sources
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn num_sources(&self) -> usize {
        self.lengths.len()
    }

    pub fn order_fallback(&self) -> bool {
        self.order_fallback
    }

    pub fn depth_fallback(&self) -> bool {
        self.depth_fallback
    }

    /// Whether either the order or the depth request was replaced by its default
    pub fn used_fallback(&self) -> bool {
        self.order_fallback || self.depth_fallback
    }

    /// Decodes a counter value into one offset per source (natural order).
    ///
    /// The sources are consumed in visiting order, the fastest first.
    ///
    /// # Errors
    ///
    /// `PointOutOfRange` if `point >= total`
    pub fn decompose(&self, point: FlatIndex) -> Result<ExpandedIndex, TraversalError> {
        if point.get() >= self.total {
            return Err(TraversalError::PointOutOfRange {
                point: point.get(),
                total: self.total,
            });
        }

        let mut offsets = vec![0; self.num_sources()];
        let mut rest = point.get();
        for &source in self.order.map() {
            let (quotient, offset) = rest.div_rem(&self.lengths[source]);
            offsets[source] = offset;
            rest = quotient;
        }
        Ok(offsets.into())
    }

    /// Inverse of [`Self::decompose`]
    ///
    /// # Errors
    ///
    /// `OffsetArity` if there is not one offset per source,
    /// `OffsetOutOfRange` if an offset is past its source's length
    pub fn flat_index(&self, offsets: &[Offset]) -> Result<FlatIndex, TraversalError> {
        if offsets.len() != self.num_sources() {
            return Err(TraversalError::OffsetArity {
                got: offsets.len(),
                expected: self.num_sources(),
            });
        }

        let mut point = 0;
        for (axis, (&offset, &len)) in offsets.iter().zip(&self.lengths).enumerate() {
            if offset >= len {
                return Err(TraversalError::OffsetOutOfRange { axis, offset, len });
            }
            point += offset * self.strides[axis];
        }
        Ok(point.into())
    }

    /// Lazily yields the offsets of every point in counter order
    pub fn index_iter(&self) -> PlanIndexIterator<'_> {
        PlanIndexIterator::new(self)
    }
}
