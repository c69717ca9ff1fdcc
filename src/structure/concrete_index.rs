use std::ops::Deref;

use derive_more::Display;
use derive_more::From;
use derive_more::Index;
use derive_more::Into;
use derive_more::IntoIterator;

use serde::{Deserialize, Serialize};

/// An offset into a single flattened source
pub type Offset = usize;

/// One offset per source, stored in natural source order
#[derive(
    Debug,
    Clone,
    Ord,
    PartialOrd,
    Eq,
    PartialEq,
    Hash,
    Index,
    Serialize,
    Deserialize,
    From,
    Into,
    Display,
    IntoIterator,
)]
#[display(fmt = "{:?}", offsets)]
pub struct ExpandedIndex {
    offsets: Vec<Offset>,
}

impl ExpandedIndex {
    pub fn into_inner(self) -> Vec<Offset> {
        self.offsets
    }
}

impl Deref for ExpandedIndex {
    type Target = [Offset];

    fn deref(&self) -> &Self::Target {
        &self.offsets
    }
}

impl FromIterator<Offset> for ExpandedIndex {
    fn from_iter<T: IntoIterator<Item = Offset>>(iter: T) -> Self {
        ExpandedIndex {
            offsets: iter.into_iter().collect(),
        }
    }
}

impl PartialEq<Vec<Offset>> for ExpandedIndex {
    fn eq(&self, other: &Vec<Offset>) -> bool {
        &self.offsets == other
    }
}

/// The running counter of a traversal, in `[0, total)`
#[derive(
    Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize, From, Into,
    Display,
)]
#[display(fmt = "{}", point)]
pub struct FlatIndex {
    point: usize,
}

impl FlatIndex {
    pub fn get(self) -> usize {
        self.point
    }
}
