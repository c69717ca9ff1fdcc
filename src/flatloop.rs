/*!

Iterates over several heterogeneous sources as if they were one flat loop.

Every source is a [`Value`]: a count, a sequence, a mapping, a dense array, a set, or a
caller-defined [`HostValue`]. Each source is classified into a [`ShapeKind`], flattened to its
requested depth, and the Cartesian product of the flattened sources is decoded from a single
running counter through a [`Plan`] (a mixed radix decomposition in a caller-chosen order).

The full value sequence is computed once, when a [`Traversal`] is built. Iterating a traversal
with a [`Cursor`] only looks values up and reports consumption to a [`Progress`] collaborator.

```
use flatloop::{OrderSpec, Traversal, Value};

let mut t = Traversal::builder()
    .source(2)
    .source(vec!["a", "b"])
    .order(OrderSpec::Last)
    .build()
    .unwrap();

let rendered: Vec<String> = t.iter().map(|v| v.to_string()).collect();
assert_eq!(rendered, ["(0, \"a\")", "(0, \"b\")", "(1, \"a\")", "(1, \"b\")"]);
assert_eq!(t.total(), 4);
assert_eq!(t[3], Value::pair(1, "b"));
```

*/

/// Dynamic values and the capability interface for host values
pub mod value;

/// Dense n-dimensional arrays
pub mod array;

/// Shape classification and normalization
pub mod shape;

/// Depth flattening
pub mod flatten;

/// Permutations with their inverse
pub mod permutation;

/// The iteration plan and index decoding
pub mod structure;

/// Computing the value sequence
pub mod materialize;

/// The progress reporting collaborator
pub mod progress;

/// Index and value iterators
pub mod iterators;

/// Traversal sessions
pub mod traversal;

pub use array::DenseArray;
pub use flatten::{flatten, nesting_depth};
pub use iterators::{Cursor, PlanIndexIterator};
pub use materialize::{materialize, value_at, MAX_VALUES};
pub use permutation::Permutation;
pub use progress::{CountingProgress, LogProgress, Progress, ProgressConfig, SilentProgress};
pub use shape::{classify, count_hint, Shape, ShapeKind};
pub use structure::concrete_index::{ExpandedIndex, FlatIndex, Offset};
pub use structure::{DepthSpec, OrderSpec, Plan, TraversalError};
pub use traversal::{Traversal, TraversalBuilder, TraversalOptions};
pub use value::{HostValue, Key, Value};

#[cfg(test)]
mod tests;
