//! Recurring intervals for background loops
//!
//! Thin wrapper over [`tokio::time::Interval`] with the tick policy spelled
//! out in configuration. The first tick completes immediately unless
//! `delay_first_tick` is set.

use std::time::Duration;

use tokio::time::{Instant, Interval as TokioInterval, MissedTickBehavior};

/// Configuration for an interval
#[derive(Debug, Clone)]
pub struct IntervalConfig {
    /// Period between ticks
    pub duration: Duration,

    /// Whether to skip ticks missed while the loop body was busy
    pub skip_missed_ticks: bool,

    /// Whether the first tick waits one full period instead of firing at once
    pub delay_first_tick: bool,
}

impl IntervalConfig {
    /// Create a new interval configuration
    pub fn new(duration: Duration) -> Self {
        Self { duration, skip_missed_ticks: false, delay_first_tick: false }
    }

    /// Set whether to skip missed ticks
    pub fn skip_missed_ticks(mut self, skip: bool) -> Self {
        self.skip_missed_ticks = skip;
        self
    }

    /// Set whether the first tick waits one period
    pub fn delay_first_tick(mut self, delay: bool) -> Self {
        self.delay_first_tick = delay;
        self
    }
}

/// A recurring interval
pub struct Interval {
    inner: TokioInterval,
}

impl Interval {
    /// Create a new interval
    ///
    /// A zero duration is clamped to one millisecond since tokio rejects a
    /// zero period.
    pub fn new(config: IntervalConfig) -> Self {
        let period = config.duration.max(Duration::from_millis(1));
        let mut inner = if config.delay_first_tick {
            tokio::time::interval_at(Instant::now() + period, period)
        } else {
            tokio::time::interval(period)
        };
        if config.skip_missed_ticks {
            inner.set_missed_tick_behavior(MissedTickBehavior::Skip);
        }

        Self { inner }
    }

    /// Create a simple interval whose first tick is immediate
    pub fn simple(duration: Duration) -> Self {
        Self::new(IntervalConfig::new(duration))
    }

    /// Wait for the next tick
    pub async fn tick(&mut self) -> Instant {
        self.inner.tick().await
    }

    /// Restart the period from now
    pub fn reset(&mut self) {
        self.inner.reset();
    }

    /// Configured period
    pub fn period(&self) -> Duration {
        self.inner.period()
    }
}

/// Create a simple interval
pub fn interval(duration: Duration) -> Interval {
    Interval::simple(duration)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_tick_is_immediate() {
        let mut interval = Interval::simple(Duration::from_millis(10));

        let start = Instant::now();
        interval.tick().await;
        let first = Instant::now();
        interval.tick().await;
        let second = Instant::now();

        assert_eq!(first.duration_since(start), Duration::ZERO);
        assert_eq!(second.duration_since(first), Duration::from_millis(10));
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_first_tick_waits_one_period() {
        let mut interval =
            Interval::new(IntervalConfig::new(Duration::from_secs(5)).delay_first_tick(true));

        let start = Instant::now();
        interval.tick().await;

        assert_eq!(Instant::now().duration_since(start), Duration::from_secs(5));
    }

    #[test]
    fn config_builder_sets_flags() {
        let config = IntervalConfig::new(Duration::from_secs(1))
            .skip_missed_ticks(true)
            .delay_first_tick(true);

        assert_eq!(config.duration, Duration::from_secs(1));
        assert!(config.skip_missed_ticks);
        assert!(config.delay_first_tick);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_period_is_clamped() {
        let interval = Interval::simple(Duration::ZERO);
        assert_eq!(interval.period(), Duration::from_millis(1));
    }
}
