use bitvec::vec::BitVec;
use serde::{Deserialize, Serialize};

/// A permutation of `0..n`, stored together with its inverse.
///
/// `map[inv[i]] == i` and `inv[map[i]] == i` for every `i`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permutation {
    map: Vec<usize>,
    inv: Vec<usize>,
}

impl Permutation {
    pub fn id(n: usize) -> Self {
        Permutation {
            map: (0..n).collect(),
            inv: (0..n).collect(),
        }
    }

    pub fn reversed(n: usize) -> Self {
        let map: Vec<usize> = (0..n).rev().collect();
        Permutation {
            inv: map.clone(),
            map,
        }
    }

    /// Builds a permutation from a map that is known to be a bijection on `0..map.len()`.
    pub fn from_map(map: Vec<usize>) -> Self {
        let mut inv = vec![0; map.len()];
        for (i, &j) in map.iter().enumerate() {
            inv[j] = i;
        }
        Permutation { map, inv }
    }

    /// Checks that `map` is a bijection onto `0..n` before building the permutation.
    pub fn try_from_map(map: &[usize], n: usize) -> Option<Self> {
        if map.len() != n {
            return None;
        }
        let mut seen: BitVec = BitVec::repeat(false, n);
        for &j in map {
            if j >= n || seen[j] {
                return None;
            }
            seen.set(j, true);
        }
        Some(Self::from_map(map.to_vec()))
    }

    pub fn map(&self) -> &[usize] {
        &self.map
    }

    pub fn inv(&self) -> &[usize] {
        &self.inv
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
