//! The progress reporting collaborator
//!
//! A traversal never renders anything itself. Its [`crate::iterators::Cursor`] reports how many
//! values were consumed through the small [`Progress`] interface, throttled by the collaborator's
//! own [`ProgressConfig`].

use std::time::{Duration, Instant};

use log::info;
use serde::{Deserialize, Serialize};

/// Display settings owned by the collaborator; the traversal passes them through untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    pub disable: bool,
    pub description: Option<String>,
    /// Minimum time between two reports
    #[serde(with = "seconds")]
    pub min_interval: Duration,
    /// Minimum number of newly consumed values between two reports
    pub min_iters: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        ProgressConfig {
            disable: false,
            description: None,
            min_interval: Duration::from_millis(100),
            min_iters: 1,
        }
    }
}

impl ProgressConfig {
    pub fn disabled() -> Self {
        ProgressConfig {
            disable: true,
            ..Default::default()
        }
    }

    /// Report on every consumed value
    pub fn unthrottled() -> Self {
        ProgressConfig {
            min_interval: Duration::ZERO,
            min_iters: 1,
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

mod seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Ok(Duration::try_from_secs_f64(secs).unwrap_or_default())
    }
}

pub trait Progress {
    fn config(&self) -> &ProgressConfig;

    /// Replaces the display settings, e.g. with the ones loaded from traversal options
    fn configure(&mut self, config: ProgressConfig);

    /// Called at the start of every pass with the number of values it will hand out
    fn start(&mut self, _total: usize) {}

    /// `k` more values were consumed since the last report
    fn advance(&mut self, k: usize);

    /// The traversal finished or was abandoned
    fn close(&mut self);

    fn is_display_enabled(&self) -> bool {
        !self.config().disable
    }
}

impl<P: Progress + ?Sized> Progress for &mut P {
    fn config(&self) -> &ProgressConfig {
        (**self).config()
    }

    fn configure(&mut self, config: ProgressConfig) {
        (**self).configure(config)
    }

    fn is_display_enabled(&self) -> bool {
        (**self).is_display_enabled()
    }

    fn start(&mut self, total: usize) {
        (**self).start(total)
    }

    fn advance(&mut self, k: usize) {
        (**self).advance(k)
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Displays nothing, whatever its settings say
#[derive(Debug, Clone)]
pub struct SilentProgress {
    config: ProgressConfig,
}

impl Default for SilentProgress {
    fn default() -> Self {
        SilentProgress {
            config: ProgressConfig::disabled(),
        }
    }
}

impl Progress for SilentProgress {
    fn config(&self) -> &ProgressConfig {
        &self.config
    }

    fn configure(&mut self, config: ProgressConfig) {
        self.config = config;
    }

    fn is_display_enabled(&self) -> bool {
        false
    }

    fn advance(&mut self, _k: usize) {}

    fn close(&mut self) {}
}

/// Writes progress lines through the `log` facade
#[derive(Debug)]
pub struct LogProgress {
    config: ProgressConfig,
    total: usize,
    n: usize,
    started: Instant,
}

impl LogProgress {
    pub fn new(config: ProgressConfig) -> Self {
        LogProgress {
            config,
            total: 0,
            n: 0,
            started: Instant::now(),
        }
    }

    pub fn n(&self) -> usize {
        self.n
    }

    fn label(&self) -> &str {
        self.config.description.as_deref().unwrap_or("traversal")
    }
}

impl Progress for LogProgress {
    fn config(&self) -> &ProgressConfig {
        &self.config
    }

    fn configure(&mut self, config: ProgressConfig) {
        self.config = config;
    }

    fn start(&mut self, total: usize) {
        self.total = total;
        self.n = 0;
        self.started = Instant::now();
    }

    fn advance(&mut self, k: usize) {
        self.n += k;
        let elapsed = self.started.elapsed().as_secs_f64();
        let rate = if elapsed > 0.0 {
            self.n as f64 / elapsed
        } else {
            0.0
        };
        info!("{}: {}/{} [{rate:.1} it/s]", self.label(), self.n, self.total);
    }

    fn close(&mut self) {
        info!(
            "{}: finished {}/{} in {:.2?}",
            self.label(),
            self.n,
            self.total,
            self.started.elapsed()
        );
    }
}

/// Records every report, for callers that want the raw counts
#[derive(Debug, Default, Clone)]
pub struct CountingProgress {
    config: ProgressConfig,
    pub total: Option<usize>,
    pub deltas: Vec<usize>,
    pub closes: usize,
}

impl CountingProgress {
    pub fn new(config: ProgressConfig) -> Self {
        CountingProgress {
            config,
            ..Default::default()
        }
    }

    pub fn n(&self) -> usize {
        self.deltas.iter().sum()
    }
}

impl Progress for CountingProgress {
    fn config(&self) -> &ProgressConfig {
        &self.config
    }

    fn configure(&mut self, config: ProgressConfig) {
        self.config = config;
    }

    fn start(&mut self, total: usize) {
        self.total = Some(total);
    }

    fn advance(&mut self, k: usize) {
        self.deltas.push(k);
    }

    fn close(&mut self) {
        self.closes += 1;
    }
}
