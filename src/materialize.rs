use std::mem::size_of;

use log::debug;

use crate::{
    structure::{concrete_index::FlatIndex, Plan, TraversalError},
    value::Value,
};

/// The largest number of values a materialized sequence can hold
pub const MAX_VALUES: usize = isize::MAX as usize / size_of::<Value>();

fn check_sources(plan: &Plan, flat_sources: &[Vec<Value>]) -> Result<(), TraversalError> {
    if flat_sources.len() != plan.num_sources() {
        return Err(TraversalError::OffsetArity {
            got: flat_sources.len(),
            expected: plan.num_sources(),
        });
    }
    let lengths = flat_sources.iter().map(Vec::len).zip(plan.lengths());
    for (source_index, (got, &expected)) in lengths.enumerate() {
        if got != expected {
            return Err(TraversalError::SourceLength {
                source_index,
                got,
                expected,
            });
        }
    }
    Ok(())
}

/// Computes the full value sequence of a plan over its flattened sources.
///
/// Each point yields a tuple with one leaf per source in natural order, or the bare leaf when
/// there is a single source. With `enumerate` every value `v` becomes `(point, v)`. No sources
/// give an empty sequence.
///
/// # Errors
///
/// `SpaceTooLarge` if the plan has more points than [`MAX_VALUES`],
/// `OffsetArity` if the number of flat sources does not match the plan,
/// `SourceLength` if a source does not have the length the plan expects
pub fn materialize(
    plan: &Plan,
    flat_sources: &[Vec<Value>],
    enumerate: bool,
) -> Result<Vec<Value>, TraversalError> {
    if plan.total() > MAX_VALUES {
        return Err(TraversalError::SpaceTooLarge {
            lengths: plan.lengths().to_vec(),
        });
    }
    check_sources(plan, flat_sources)?;
    if plan.num_sources() == 0 {
        return Ok(Vec::new());
    }

    let mut values = Vec::with_capacity(plan.total());
    for (point, offsets) in plan.index_iter().enumerate() {
        let mut leaves = flat_sources
            .iter()
            .zip(offsets.iter())
            .map(|(source, &offset)| source[offset].clone());

        let value = if plan.num_sources() == 1 {
            leaves.next().unwrap_or_default()
        } else {
            Value::Tuple(leaves.collect())
        };

        values.push(if enumerate {
            Value::pair(point, value)
        } else {
            value
        });
    }
    debug!("materialized {} values", values.len());
    Ok(values)
}

/// The value at a single point, computed on demand instead of materialized
///
/// # Errors
///
/// `PointOutOfRange` if the point is outside the plan, `OffsetArity` or `SourceLength` if the
/// sources do not match the plan
pub fn value_at(
    plan: &Plan,
    flat_sources: &[Vec<Value>],
    point: FlatIndex,
) -> Result<Value, TraversalError> {
    check_sources(plan, flat_sources)?;
    let offsets = plan.decompose(point)?;
    let mut leaves: Vec<Value> = flat_sources
        .iter()
        .zip(offsets.iter())
        .map(|(source, &offset)| source[offset].clone())
        .collect();
    Ok(match leaves.len() {
        1 => leaves.swap_remove(0),
        _ => Value::Tuple(leaves),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structure::{DepthSpec, OrderSpec};

    fn plan_for(sources: &[Vec<Value>], order: OrderSpec) -> Plan {
        let lengths = sources.iter().map(Vec::len).collect();
        Plan::build(lengths, &order, &DepthSpec::default()).unwrap()
    }

    fn ints(range: std::ops::Range<i64>) -> Vec<Value> {
        range.map(Value::Int).collect()
    }

    #[test]
    fn single_source_is_not_wrapped() {
        let sources = vec![ints(0..3)];
        let values = materialize(&plan_for(&sources, OrderSpec::First), &sources, false).unwrap();
        assert_eq!(values, ints(0..3));
    }

    #[test]
    fn pairs_follow_the_order() {
        let sources = vec![ints(0..2), ints(0..2)];
        let first = materialize(&plan_for(&sources, OrderSpec::First), &sources, false).unwrap();
        let rendered: Vec<String> = first.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["(0, 0)", "(1, 0)", "(0, 1)", "(1, 1)"]);

        let last = materialize(&plan_for(&sources, OrderSpec::Last), &sources, false).unwrap();
        let rendered: Vec<String> = last.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, ["(0, 0)", "(0, 1)", "(1, 0)", "(1, 1)"]);
    }

    #[test]
    fn enumeration_pairs_with_the_counter() {
        let sources = vec![ints(5..7), vec![Value::from("x")]];
        let plan = plan_for(&sources, OrderSpec::First);
        let plain = materialize(&plan, &sources, false).unwrap();
        let numbered = materialize(&plan, &sources, true).unwrap();
        for (i, (v, n)) in plain.iter().zip(&numbered).enumerate() {
            assert_eq!(n, &Value::pair(i, v.clone()));
        }
    }

    #[test]
    fn degenerate_sources() {
        let none: Vec<Vec<Value>> = vec![];
        assert!(materialize(&plan_for(&none, OrderSpec::First), &none, false)
            .unwrap()
            .is_empty());

        let with_empty = vec![ints(0..3), vec![]];
        let plan = plan_for(&with_empty, OrderSpec::First);
        assert_eq!(plan.total(), 0);
        assert!(materialize(&plan, &with_empty, true).unwrap().is_empty());
    }

    #[test]
    fn on_demand_matches_materialized() {
        let sources = vec![ints(0..3), ints(10..12), ints(20..22)];
        let plan = plan_for(&sources, OrderSpec::Explicit(vec![2, 0, 1]));
        let values = materialize(&plan, &sources, false).unwrap();
        for (p, v) in values.iter().enumerate() {
            assert_eq!(&value_at(&plan, &sources, p.into()).unwrap(), v);
        }
        assert!(value_at(&plan, &sources, values.len().into()).is_err());
        assert!(materialize(&plan, &sources[..2], false).is_err());
    }

    #[test]
    fn sources_must_match_the_plan() {
        let plan = Plan::build(vec![3], &OrderSpec::First, &DepthSpec::default()).unwrap();
        let short = vec![ints(0..1)];
        assert_eq!(
            materialize(&plan, &short, false),
            Err(TraversalError::SourceLength {
                source_index: 0,
                got: 1,
                expected: 3
            })
        );
        assert!(matches!(
            value_at(&plan, &short, 1.into()),
            Err(TraversalError::SourceLength { .. })
        ));

        let long = vec![ints(0..3), ints(0..4)];
        let plan = Plan::build(vec![3, 2], &OrderSpec::Last, &DepthSpec::default()).unwrap();
        assert!(matches!(
            materialize(&plan, &long, false),
            Err(TraversalError::SourceLength { source_index: 1, .. })
        ));
    }

    #[test]
    fn unaddressable_spaces_are_rejected_before_allocating() {
        let plan =
            Plan::build(vec![MAX_VALUES + 1], &OrderSpec::First, &DepthSpec::default()).unwrap();
        assert!(matches!(
            materialize(&plan, &[vec![]], false),
            Err(TraversalError::SpaceTooLarge { .. })
        ));
    }
}
