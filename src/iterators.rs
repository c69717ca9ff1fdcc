//! Iterators over a traversal
//!
//! - [`PlanIndexIterator`] walks the offsets of every point of a [`Plan`] lazily.
//! - [`Cursor`] hands out the materialized values of a [`crate::Traversal`] one by one and
//!   reports the consumption to its [`Progress`] collaborator.

use std::time::Instant;

use crate::{
    progress::Progress,
    structure::{
        concrete_index::{ExpandedIndex, FlatIndex},
        Plan,
    },
    value::Value,
};

pub struct PlanIndexIterator<'a> {
    plan: &'a Plan,
    current_flat_index: FlatIndex,
}

impl<'a> PlanIndexIterator<'a> {
    #[must_use]
    pub fn new(plan: &'a Plan) -> Self {
        PlanIndexIterator {
            plan,
            current_flat_index: 0.into(),
        }
    }
}

impl Iterator for PlanIndexIterator<'_> {
    type Item = ExpandedIndex;
    fn next(&mut self) -> Option<Self::Item> {
        if let Ok(offsets) = self.plan.decompose(self.current_flat_index) {
            self.current_flat_index = (self.current_flat_index.get() + 1).into();
            Some(offsets)
        } else {
            None
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self
            .plan
            .total()
            .saturating_sub(self.current_flat_index.get());
        (left, Some(left))
    }
}

impl ExactSizeIterator for PlanIndexIterator<'_> {}

/// A forward-only pass over the materialized values.
///
/// Progress is reported once at least `min_iters` new values were handed out and `min_interval`
/// has elapsed since the previous report. The unreported remainder is flushed and the
/// collaborator closed exactly once, when the cursor is exhausted or dropped.
pub struct Cursor<'a, P: Progress> {
    values: &'a [Value],
    progress: P,
    position: usize,
    last_report_n: usize,
    last_report_t: Instant,
    closed: bool,
}

impl<'a, P: Progress> Cursor<'a, P> {
    /// Starts a pass; the collaborator is told how many values it will see
    pub fn new(values: &'a [Value], mut progress: P) -> Self {
        progress.start(values.len());
        Cursor {
            values,
            progress,
            position: 0,
            last_report_n: 0,
            last_report_t: Instant::now(),
            closed: false,
        }
    }

    /// Number of values handed out so far
    pub fn position(&self) -> usize {
        self.position
    }

    fn report(&mut self) {
        if !self.progress.is_display_enabled() {
            return;
        }
        let config = self.progress.config();
        let pending = self.position - self.last_report_n;
        if pending < config.min_iters.max(1) {
            return;
        }
        let now = Instant::now();
        if now.duration_since(self.last_report_t) >= config.min_interval {
            self.progress.advance(pending);
            self.last_report_n = self.position;
            self.last_report_t = now;
        }
    }

    fn finish(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let pending = self.position - self.last_report_n;
        if pending > 0 && self.progress.is_display_enabled() {
            self.progress.advance(pending);
            self.last_report_n = self.position;
        }
        self.progress.close();
    }
}

impl<'a, P: Progress> Iterator for Cursor<'a, P> {
    type Item = &'a Value;

    fn next(&mut self) -> Option<Self::Item> {
        let values = self.values;
        match values.get(self.position) {
            Some(value) => {
                self.position += 1;
                self.report();
                Some(value)
            }
            None => {
                self.finish();
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.values.len() - self.position;
        (left, Some(left))
    }
}

impl<P: Progress> ExactSizeIterator for Cursor<'_, P> {}

impl<P: Progress> Drop for Cursor<'_, P> {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::{
        progress::{CountingProgress, ProgressConfig},
        structure::{DepthSpec, OrderSpec},
    };

    fn values(n: i64) -> Vec<Value> {
        (0..n).map(Value::Int).collect()
    }

    #[test]
    fn index_iterator_covers_the_plan() {
        let plan = Plan::build(vec![2, 3], &OrderSpec::Last, &DepthSpec::default()).unwrap();
        let iter = plan.index_iter();
        assert_eq!(iter.len(), 6);
        let all: Vec<_> = iter.collect();
        assert_eq!(all[1], vec![0, 1]);
        assert_eq!(all[5], vec![1, 2]);
    }

    #[test]
    fn unthrottled_reports_every_value() {
        let data = values(5);
        let mut progress = CountingProgress::new(ProgressConfig::unthrottled());
        let seen: Vec<&Value> = Cursor::new(&data, &mut progress).collect();
        assert_eq!(seen.len(), 5);
        assert_eq!(progress.total, Some(5));
        assert_eq!(progress.deltas, vec![1; 5]);
        assert_eq!(progress.closes, 1);
    }

    #[test]
    fn min_iters_batches_reports() {
        let data = values(10);
        let config = ProgressConfig {
            min_interval: Duration::ZERO,
            min_iters: 4,
            ..Default::default()
        };
        let mut progress = CountingProgress::new(config);
        assert_eq!(Cursor::new(&data, &mut progress).count(), 10);
        assert_eq!(progress.deltas, vec![4, 4, 2]);
        assert_eq!(progress.n(), 10);
        assert_eq!(progress.closes, 1);
    }

    #[test]
    fn long_interval_defers_to_the_final_flush() {
        let data = values(7);
        let config = ProgressConfig {
            min_interval: Duration::from_secs(3600),
            ..Default::default()
        };
        let mut progress = CountingProgress::new(config);
        Cursor::new(&data, &mut progress).for_each(drop);
        assert_eq!(progress.deltas, vec![7]);
    }

    #[test]
    fn disabled_display_still_yields_and_closes() {
        let data = values(3);
        let mut progress = CountingProgress::new(ProgressConfig::disabled());
        let seen: Vec<_> = Cursor::new(&data, &mut progress).cloned().collect();
        assert_eq!(seen, data);
        assert!(progress.deltas.is_empty());
        assert_eq!(progress.closes, 1);
    }

    #[test]
    fn dropping_early_flushes_and_closes_once() {
        let data = values(10);
        let mut progress = CountingProgress::new(ProgressConfig {
            min_interval: Duration::from_secs(3600),
            ..Default::default()
        });
        {
            let mut cursor = Cursor::new(&data, &mut progress);
            cursor.next();
            cursor.next();
            cursor.next();
            assert_eq!(cursor.position(), 3);
            assert_eq!(cursor.len(), 7);
        }
        assert_eq!(progress.deltas, vec![3]);
        assert_eq!(progress.closes, 1);
    }

    #[test]
    fn exhausted_cursor_closes_once() {
        let data = values(1);
        let mut progress = CountingProgress::new(ProgressConfig::unthrottled());
        {
            let mut cursor = Cursor::new(&data, &mut progress);
            assert!(cursor.next().is_some());
            assert!(cursor.next().is_none());
            assert!(cursor.next().is_none());
        }
        assert_eq!(progress.closes, 1);
        assert_eq!(progress.n(), 1);
    }
}
