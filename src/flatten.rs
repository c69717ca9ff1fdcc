//! Depth flattening of a single source
//!
//! `flatten(value, 0)` only normalizes the source into its elements. Each additional depth
//! level dissolves one more level of nesting (mapping values, sequence elements) into a single
//! flat sequence, depth first, left to right. Numbers and opaque units nested inside a container
//! are leaves and are kept as they are; requesting more depth than the data has changes nothing.

use log::trace;

use crate::{
    shape::{classify, ShapeKind},
    value::Value,
};

pub fn flatten(value: &Value, depth: usize) -> Vec<Value> {
    let kind = classify(value);
    if depth == 0 {
        return kind.into_elements();
    }

    let flat = match kind {
        ShapeKind::Count(_) | ShapeKind::Opaque(_) => kind.into_elements(),
        container => {
            let mut out = Vec::new();
            for child in container.into_children().unwrap_or_default() {
                collect_leaves(child, depth - 1, &mut out);
            }
            out
        }
    };
    trace!("flattened {value} at depth {depth} into {} leaves", flat.len());
    flat
}

fn collect_leaves(value: Value, remaining: usize, out: &mut Vec<Value>) {
    let kind = classify(&value);
    if !kind.is_container() {
        out.push(value);
    } else if remaining == 0 {
        out.extend(kind.into_elements());
    } else {
        for child in kind.into_children().unwrap_or_default() {
            collect_leaves(child, remaining - 1, out);
        }
    }
}

/// How many levels of containers `value` has along its deepest path
pub fn nesting_depth(value: &Value) -> usize {
    match classify(value).into_children() {
        None => 0,
        Some(children) => 1 + children.iter().map(nesting_depth).max().unwrap_or(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{array::DenseArray, value::Key};

    fn three_level_map() -> Value {
        (0..2)
            .map(|k| {
                let inner: Value = (0..2)
                    .map(|j| {
                        let leaf: Value = (0..2)
                            .map(|i| {
                                let n = i + j * 2 + k * 4;
                                (n.to_string(), n)
                            })
                            .collect();
                        ((j * 2 + k * 4).to_string(), leaf)
                    })
                    .collect();
                ((k * 4).to_string(), inner)
            })
            .collect()
    }

    #[test]
    fn depth_zero_only_normalizes() {
        assert_eq!(flatten(&Value::Int(3), 0), vec![Value::Int(0), Value::Int(1), Value::Int(2)]);
        assert_eq!(
            flatten(&Value::from(vec![1, 2]), 0),
            vec![Value::Int(1), Value::Int(2)]
        );
        assert_eq!(flatten(&Value::Bool(false), 0), vec![Value::Bool(false)]);
    }

    #[test]
    fn counts_ignore_depth() {
        assert_eq!(flatten(&Value::Int(3), 4), flatten(&Value::Int(3), 0));
    }

    #[test]
    fn opaque_units_stay_single() {
        assert_eq!(flatten(&Value::Unit, 2), vec![Value::Unit]);
    }

    #[test]
    fn mapping_levels_dissolve() {
        let map = three_level_map();

        let one = flatten(&map, 1);
        assert_eq!(one.len(), 4);
        for (i, entry) in one.iter().enumerate() {
            let m = entry.as_map().unwrap();
            assert_eq!(m.len(), 1);
            assert!(m.contains_key(&Key::from((i * 2).to_string())));
        }

        let two = flatten(&map, 2);
        let expected: Vec<Value> = (0..8).map(|i| Value::entry(i.to_string(), i)).collect();
        assert_eq!(two, expected);

        let three = flatten(&map, 3);
        assert_eq!(three, (0..8).map(Value::from).collect::<Vec<_>>());
        assert_eq!(flatten(&map, 7), three);
    }

    #[test]
    fn arrays_flatten_into_sub_arrays() {
        let a: Value = DenseArray::arange(&[2; 5]).into();
        let flat = flatten(&a, 2);
        assert_eq!(flat.len(), 8);
        for (i, leaf) in flat.iter().enumerate() {
            let sub = leaf.as_array().unwrap();
            assert_eq!(sub.shape(), &[2, 2]);
            assert_eq!(sub.data()[0], Value::from(i * 4));
        }
        assert_eq!(flatten(&a, 4).len(), 32);
        assert_eq!(flatten(&a, 5), flatten(&a, 4));
    }

    #[test]
    fn nested_numbers_are_leaves() {
        let v = Value::List(vec![
            Value::Int(1),
            Value::from(vec![2, 3]),
            Value::from(vec![Value::from(vec![4])]),
        ]);
        assert_eq!(nesting_depth(&v), 3);
        let deep = flatten(&v, 3);
        assert_eq!(deep, (1..5).map(Value::from).collect::<Vec<_>>());
        assert_eq!(flatten(&v, 10), deep);
    }

    #[test]
    fn text_dissolves_into_chars() {
        let v = Value::from(vec!["ab", "c"]);
        assert_eq!(
            flatten(&v, 1),
            vec![Value::Char('a'), Value::Char('b'), Value::Char('c')]
        );
        assert_eq!(flatten(&v, 2), flatten(&v, 1));
    }
}
