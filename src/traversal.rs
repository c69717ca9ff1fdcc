use std::ops::{Index, Range};

use anyhow::{Context, Result};
use delegate::delegate;
use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::{
    flatten::flatten,
    iterators::Cursor,
    materialize::{materialize, MAX_VALUES},
    progress::{Progress, ProgressConfig, SilentProgress},
    shape::count_hint,
    structure::{
        concrete_index::{ExpandedIndex, FlatIndex},
        DepthSpec, OrderSpec, Plan, TraversalError,
    },
    value::Value,
};

/// Everything a traversal can be configured with besides its sources
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraversalOptions {
    pub depth: DepthSpec,
    pub order: OrderSpec,
    #[serde(rename = "enum")]
    pub enumerate: bool,
    /// Display settings handed to the collaborator when the traversal is built
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressConfig>,
}

impl TraversalOptions {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid traversal options")
    }
}

/// A traversal session: several sources iterated as one flat loop.
///
/// All values are computed when the session is built; iterating only looks them up, so every
/// pass over the same session yields the same sequence.
#[derive(Debug)]
pub struct Traversal<P: Progress = SilentProgress> {
    plan: Plan,
    sources: Vec<Vec<Value>>,
    values: Vec<Value>,
    enumerate: bool,
    progress: P,
}

impl Traversal {
    pub fn builder() -> TraversalBuilder {
        TraversalBuilder::default()
    }

    /// A traversal over `sources` with default options and no progress display
    ///
    /// # Errors
    ///
    /// `SpaceTooLarge` if the combined iteration space overflows
    pub fn new(sources: impl IntoIterator<Item = Value>) -> Result<Self, TraversalError> {
        Self::builder().sources(sources).build()
    }
}

impl<P: Progress> Traversal<P> {
    delegate! {
        to self.plan {
            /// Size of the combined iteration space
            pub fn total(&self) -> usize;
            /// Flattened length of every source, in natural order
            pub fn lengths(&self) -> &[usize];
            pub fn num_sources(&self) -> usize;
        }
        to self.values {
            /// Number of materialized values
            pub fn len(&self) -> usize;
            pub fn is_empty(&self) -> bool;
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// The flattened form of every source, in natural order
    pub fn flat_sources(&self) -> &[Vec<Value>] {
        &self.sources
    }

    pub fn is_enumerated(&self) -> bool {
        self.enumerate
    }

    pub fn progress(&self) -> &P {
        &self.progress
    }

    pub fn into_progress(self) -> P {
        self.progress
    }

    /// # Errors
    ///
    /// `IndexOutOfRange` past the end of the materialized values
    pub fn get(&self, index: usize) -> Result<&Value, TraversalError> {
        self.values
            .get(index)
            .ok_or(TraversalError::IndexOutOfRange {
                index,
                len: self.values.len(),
            })
    }

    /// # Errors
    ///
    /// `IndexOutOfRange` if the range reaches past the end or is reversed
    pub fn slice(&self, range: Range<usize>) -> Result<&[Value], TraversalError> {
        let len = self.values.len();
        if range.start > range.end {
            return Err(TraversalError::IndexOutOfRange {
                index: range.start,
                len,
            });
        }
        self.values
            .get(range.clone())
            .ok_or(TraversalError::IndexOutOfRange {
                index: range.end,
                len,
            })
    }

    /// Offsets into every flattened source for a counter value
    ///
    /// # Errors
    ///
    /// `PointOutOfRange` if `point >= total`
    pub fn decompose(&self, point: usize) -> Result<ExpandedIndex, TraversalError> {
        self.plan.decompose(FlatIndex::from(point))
    }

    /// A fresh pass over the values, reporting to this session's collaborator
    pub fn iter(&mut self) -> Cursor<'_, &mut P> {
        Cursor::new(&self.values, &mut self.progress)
    }

    /// A pass that reports to another collaborator
    pub fn iter_with<Q: Progress>(&self, progress: Q) -> Cursor<'_, Q> {
        Cursor::new(&self.values, progress)
    }
}

impl<P: Progress> Index<usize> for Traversal<P> {
    type Output = Value;

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[index]
    }
}

impl<'a, P: Progress> IntoIterator for &'a mut Traversal<P> {
    type Item = &'a Value;
    type IntoIter = Cursor<'a, &'a mut P>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Debug, Default)]
pub struct TraversalBuilder<P: Progress = SilentProgress> {
    sources: Vec<Value>,
    options: TraversalOptions,
    progress: P,
}

impl<P: Progress> TraversalBuilder<P> {
    pub fn source(mut self, source: impl Into<Value>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn sources<V: Into<Value>>(mut self, sources: impl IntoIterator<Item = V>) -> Self {
        self.sources.extend(sources.into_iter().map(Into::into));
        self
    }

    pub fn depth(mut self, depth: impl Into<DepthSpec>) -> Self {
        self.options.depth = depth.into();
        self
    }

    pub fn order(mut self, order: impl Into<OrderSpec>) -> Self {
        self.options.order = order.into();
        self
    }

    pub fn enumerate(mut self, enumerate: bool) -> Self {
        self.options.enumerate = enumerate;
        self
    }

    pub fn options(mut self, options: TraversalOptions) -> Self {
        self.options = options;
        self
    }

    /// Reports to `progress`. Display settings in the options, if any, are applied to it on
    /// [`Self::build`]; otherwise it keeps its own.
    pub fn progress<Q: Progress>(self, progress: Q) -> TraversalBuilder<Q> {
        TraversalBuilder {
            sources: self.sources,
            options: self.options,
            progress,
        }
    }

    /// Classifies, flattens and materializes every source.
    ///
    /// # Errors
    ///
    /// `SpaceTooLarge` if the combined iteration space overflows or has more points than a
    /// materialized sequence can hold
    pub fn build(self) -> Result<Traversal<P>, TraversalError> {
        let TraversalBuilder {
            sources,
            options,
            mut progress,
        } = self;

        // counts are expanded to `0..n` below, so their product is bounded first
        let counts: Vec<usize> = sources.iter().filter_map(count_hint).collect();
        let counted = counts
            .iter()
            .filter(|&&n| n > 0)
            .try_fold(1usize, |acc, &n| acc.checked_mul(n));
        if !counted.is_some_and(|n| n <= MAX_VALUES) {
            return Err(TraversalError::SpaceTooLarge { lengths: counts });
        }

        let (depths, _) = options.depth.resolve(sources.len());
        let flat: Vec<Vec<Value>> = sources
            .iter()
            .zip(&depths)
            .map(|(source, &depth)| flatten(source, depth))
            .collect();
        for (i, source) in flat.iter().enumerate() {
            trace!("source {i} has {} elements", source.len());
        }

        let lengths = flat.iter().map(Vec::len).collect();
        let plan = Plan::build(lengths, &options.order, &options.depth)?;
        if plan.used_fallback() {
            debug!(
                "options {:?}/{:?} were replaced by order {:?} and depths {:?}",
                options.order,
                options.depth,
                plan.order(),
                plan.depths()
            );
        }

        let values = materialize(&plan, &flat, options.enumerate)?;
        if let Some(config) = options.progress {
            progress.configure(config);
        }

        Ok(Traversal {
            plan,
            sources: flat,
            values,
            enumerate: options.enumerate,
            progress,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::{CountingProgress, LogProgress};

    #[test]
    fn options_from_json() {
        let options = TraversalOptions::from_json_str(
            r#"{"depth": [0, 2], "order": "last", "enum": true, "progress": {"disable": true}}"#,
        )
        .unwrap();
        assert_eq!(options.depth, DepthSpec::PerSource(vec![0, 2]));
        assert_eq!(options.order, OrderSpec::Last);
        assert!(options.enumerate);
        assert_eq!(options.progress.map(|p| p.disable), Some(true));

        assert_eq!(
            TraversalOptions::from_json_str("{}").unwrap(),
            TraversalOptions::default()
        );
        assert!(TraversalOptions::from_json_str(r#"{"enum": "yes"}"#).is_err());
    }

    #[test]
    fn query_interface() {
        let t = Traversal::builder()
            .source(3)
            .source("ab")
            .build()
            .unwrap();
        assert_eq!(t.total(), 6);
        assert_eq!(t.len(), 6);
        assert_eq!(t.lengths(), &[3, 2]);
        assert_eq!(t.num_sources(), 2);
        assert_eq!(t[4], Value::Tuple(vec![Value::Int(1), Value::Char('b')]));
        assert_eq!(t.get(5).unwrap().to_string(), "(2, 'b')");
        assert_eq!(
            t.get(6),
            Err(TraversalError::IndexOutOfRange { index: 6, len: 6 })
        );
        assert_eq!(t.slice(1..3).unwrap().len(), 2);
        assert!(t.slice(0..0).unwrap().is_empty());
        assert!(t.slice(4..7).is_err());
        assert_eq!(t.decompose(5).unwrap(), vec![2, 1]);
    }

    #[test]
    fn repeated_passes_replay_the_same_values() {
        let mut t = Traversal::builder()
            .sources([Value::from(vec![1, 2]), Value::Int(2)])
            .progress(CountingProgress::new(ProgressConfig::unthrottled()))
            .build()
            .unwrap();
        assert_eq!(t.progress().total, None);

        let first: Vec<Value> = t.iter().take(2).cloned().collect();
        let second: Vec<Value> = t.iter().cloned().collect();
        assert_eq!(first[..], second[..2]);
        let third: Vec<Value> = (&mut t).into_iter().cloned().collect();
        assert_eq!(second, third);

        let progress = t.into_progress();
        assert_eq!(progress.total, Some(4));
        assert_eq!(progress.closes, 3);
        assert_eq!(progress.n(), 10);
    }

    #[test]
    fn every_pass_restarts_the_collaborator() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut t = Traversal::builder()
            .source(4)
            .progress(LogProgress::new(ProgressConfig::unthrottled()))
            .build()
            .unwrap();
        assert_eq!(t.iter().count(), 4);
        assert_eq!(t.progress().n(), 4);
        assert_eq!(t.iter().take(3).count(), 3);
        assert_eq!(t.progress().n(), 3);
    }

    #[test]
    fn options_configure_the_collaborator() {
        let options = TraversalOptions::from_json_str(
            r#"{"progress": {"min_interval": 0.0, "min_iters": 4, "description": "grid"}}"#,
        )
        .unwrap();

        let mut t = Traversal::builder()
            .options(options.clone())
            .source(8)
            .progress(CountingProgress::new(ProgressConfig::unthrottled()))
            .build()
            .unwrap();
        assert_eq!(t.iter().count(), 8);
        assert_eq!(t.progress().deltas, vec![4, 4]);
        assert_eq!(t.progress().config().description.as_deref(), Some("grid"));

        let mut t = Traversal::builder()
            .progress(CountingProgress::default())
            .source(8)
            .options(options)
            .build()
            .unwrap();
        t.iter().for_each(drop);
        assert_eq!(t.progress().deltas, vec![4, 4]);

        let disabled =
            TraversalOptions::from_json_str(r#"{"progress": {"disable": true}}"#).unwrap();
        let quiet = Traversal::builder()
            .options(disabled)
            .source(3)
            .build()
            .unwrap();
        assert!(quiet.progress().config().disable);
    }

    #[test]
    fn malformed_order_and_depth_options_fall_back() {
        for json in [r#"{"order": [0, -1]}"#, r#"{"order": 3}"#, r#"{"depth": "all"}"#] {
            let options = TraversalOptions::from_json_str(json).unwrap();
            let t = Traversal::builder()
                .source(vec![vec![1, 2], vec![3]])
                .source(2)
                .options(options)
                .build()
                .unwrap();
            assert!(t.plan().used_fallback(), "{json}");
            assert_eq!(t.plan().order(), &[0, 1]);
            assert_eq!(t.lengths(), &[2, 2]);
        }
    }

    #[test]
    fn huge_counts_fail_before_expanding() {
        let err = Traversal::builder().source(i64::MAX).build().unwrap_err();
        assert!(matches!(err, TraversalError::SpaceTooLarge { .. }));

        let err = Traversal::builder()
            .source(1i64 << 40)
            .source(1i64 << 40)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            TraversalError::SpaceTooLarge {
                lengths: vec![1 << 40, 1 << 40]
            }
        );

        let t = Traversal::builder().source(0).source(vec![1, 2]).build().unwrap();
        assert!(t.is_empty());
    }

    #[test]
    fn collaborator_keeps_its_settings_without_progress_options() {
        let t = Traversal::builder()
            .options(TraversalOptions {
                enumerate: true,
                ..Default::default()
            })
            .source(2)
            .progress(CountingProgress::new(ProgressConfig::disabled()))
            .build()
            .unwrap();
        assert!(t.is_enumerated());
        assert!(!t.progress().is_display_enabled());
        assert_eq!(t[1], Value::pair(1, 1));
    }
}
