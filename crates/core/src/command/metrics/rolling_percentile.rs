//! Rolling latency percentiles.
//!
//! Samples land in the current bucket's bounded reservoir; the
//! [`PercentileSnapshot`] served to readers is rebuilt only when the window
//! rotates, so reads are stale by at most one bucket duration. The snapshot
//! covers every bucket the ring has opened rather than a strict time filter.

use std::sync::Arc;
use std::time::Duration;

use bulwark_common::time::{Clock, SystemClock};
use bulwark_common::RingBuffer;
use parking_lot::Mutex;

use super::bucket::BucketRing;

/// Percentiles precomputed on every snapshot.
pub const SNAPSHOT_PERCENTILES: [f64; 12] =
    [0.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0, 99.5, 99.9, 100.0];

/// Immutable latency aggregate over the samples retained at rotation time.
#[derive(Debug, Clone, PartialEq)]
pub struct PercentileSnapshot {
    sorted: Vec<u64>,
    mean: f64,
    fixed: [f64; SNAPSHOT_PERCENTILES.len()],
}

impl PercentileSnapshot {
    /// Build a snapshot from raw samples in any order.
    pub fn from_samples(mut samples: Vec<u64>) -> Self {
        samples.sort_unstable();
        let mean = if samples.is_empty() {
            0.0
        } else {
            samples.iter().map(|&v| v as f64).sum::<f64>() / samples.len() as f64
        };
        let fixed = SNAPSHOT_PERCENTILES.map(|p| estimate(&samples, p));
        Self { sorted: samples, mean, fixed }
    }

    pub fn empty() -> Self {
        Self::from_samples(Vec::new())
    }

    /// Value at percentile `p` (0 to 100). Returns 0 with no samples.
    ///
    /// The estimator places sample `i` at percentile `100 * (i + 0.5) / n`
    /// and interpolates linearly between neighbours.
    pub fn percentile(&self, p: f64) -> f64 {
        SNAPSHOT_PERCENTILES
            .iter()
            .position(|&fixed| fixed == p)
            .map_or_else(|| estimate(&self.sorted, p), |slot| self.fixed[slot])
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Number of samples the snapshot was built from.
    pub fn len(&self) -> usize {
        self.sorted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sorted.is_empty()
    }
}

impl Default for PercentileSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}

fn estimate(sorted: &[u64], p: f64) -> f64 {
    let Some(&last) = sorted.last() else {
        return 0.0;
    };
    let n = sorted.len();
    let position = n as f64 * p.clamp(0.0, 100.0) / 100.0 - 0.5;
    if position <= 0.0 {
        return sorted[0] as f64;
    }
    if position >= (n - 1) as f64 {
        return last as f64;
    }

    let lower = position.floor() as usize;
    let fraction = position - lower as f64;
    let low = sorted[lower] as f64;
    let high = sorted[lower + 1] as f64;
    low + fraction * (high - low)
}

struct PercentileState {
    ring: BucketRing<RingBuffer<u64>>,
    snapshot: Arc<PercentileSnapshot>,
}

impl PercentileState {
    fn rotate(&mut self, now: std::time::Instant) {
        if self.ring.rotate(now) {
            let samples = self.ring.allocated().flat_map(|bucket| bucket.iter().copied()).collect();
            self.snapshot = Arc::new(PercentileSnapshot::from_samples(samples));
        }
    }
}

/// Rolling window of latency samples with a cached percentile snapshot.
pub struct RollingPercentile<C: Clock = SystemClock> {
    clock: Arc<C>,
    state: Mutex<PercentileState>,
}

impl<C: Clock> std::fmt::Debug for RollingPercentile<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingPercentile").field("snapshot", &self.snapshot()).finish()
    }
}

impl<C: Clock> RollingPercentile<C> {
    /// Window of `bucket_count` buckets over `window_length`, each keeping at
    /// most `bucket_size` samples (oldest overwritten first).
    pub fn new(window_length: Duration, bucket_count: usize, bucket_size: usize, clock: Arc<C>) -> Self {
        let ring = BucketRing::new(window_length, bucket_count, clock.now(), || {
            RingBuffer::new(bucket_size)
        });
        let state = PercentileState { ring, snapshot: Arc::new(PercentileSnapshot::empty()) };
        Self { clock, state: Mutex::new(state) }
    }

    /// Record one sample. Never rebuilds the snapshot on its own.
    pub fn add_value(&self, value: u64) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.rotate(now);
        state.ring.current_mut().push(value);
    }

    pub fn percentile(&self, p: f64) -> f64 {
        self.snapshot().percentile(p)
    }

    pub fn mean(&self) -> f64 {
        self.snapshot().mean()
    }

    /// Current cached snapshot, rotating first if a bucket has expired.
    pub fn snapshot(&self) -> Arc<PercentileSnapshot> {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.rotate(now);
        Arc::clone(&state.snapshot)
    }

    pub fn reset(&self) {
        let now = self.clock.now();
        let mut state = self.state.lock();
        state.ring.reset(now);
        state.snapshot = Arc::new(PercentileSnapshot::empty());
    }
}

#[cfg(test)]
mod tests {
    use bulwark_common::testing::assert_approx_eq;
    use bulwark_common::MockClock;

    use super::*;

    fn window(clock: &MockClock) -> RollingPercentile<MockClock> {
        RollingPercentile::new(Duration::from_millis(60_000), 6, 100, Arc::new(clock.clone()))
    }

    #[test]
    fn test_empty_window_returns_zero() {
        let clock = MockClock::new();
        let latencies = window(&clock);
        assert_eq!(latencies.mean(), 0.0);
        assert_eq!(latencies.percentile(50.0), 0.0);
        assert_eq!(latencies.percentile(99.5), 0.0);
    }

    /// Validates the snapshot stays stale until rotation and then reflects
    /// every retained sample.
    #[test]
    fn test_snapshot_recomputed_on_rotation() {
        let clock = MockClock::new();
        let latencies = window(&clock);

        for value in [1, 2, 3, 10, 8, 4, 3] {
            latencies.add_value(value);
        }
        assert_eq!(latencies.mean(), 0.0, "snapshot must not change before rotation");

        clock.advance_millis(10_001);

        assert_approx_eq(latencies.mean(), 4.43, 0.01);
        assert_approx_eq(latencies.percentile(50.0), 3.0, 0.001);
        assert_approx_eq(latencies.percentile(0.0), 1.0, 0.001);
        assert_approx_eq(latencies.percentile(100.0), 10.0, 0.001);
    }

    #[test]
    fn test_snapshot_spans_all_allocated_buckets() {
        let clock = MockClock::new();
        let latencies = window(&clock);

        latencies.add_value(10);
        clock.advance_millis(10_000);
        latencies.add_value(20);
        clock.advance_millis(10_000);

        let snapshot = latencies.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_approx_eq(snapshot.mean(), 15.0, 0.001);
    }

    /// Validates the per-bucket reservoir keeps only the newest samples.
    #[test]
    fn test_bucket_overflow_overwrites_oldest() {
        let clock = MockClock::new();
        let latencies =
            RollingPercentile::new(Duration::from_millis(2_000), 2, 3, Arc::new(clock.clone()));

        for value in [100, 1, 2, 3] {
            latencies.add_value(value);
        }
        clock.advance_millis(1_000);

        let snapshot = latencies.snapshot();
        assert_eq!(snapshot.len(), 3);
        assert_approx_eq(snapshot.percentile(100.0), 3.0, 0.001);
    }

    #[test]
    fn test_interpolated_percentile() {
        let snapshot = PercentileSnapshot::from_samples(vec![10, 20, 30, 40]);
        // position = 4 * 0.25 - 0.5 = 0.5
        assert_approx_eq(snapshot.percentile(25.0), 15.0, 0.001);
        // position = 4 * 0.6 - 0.5 = 1.9
        assert_approx_eq(snapshot.percentile(60.0), 29.0, 0.001);
    }

    #[test]
    fn test_reset_empties_snapshot() {
        let clock = MockClock::new();
        let latencies = window(&clock);
        latencies.add_value(42);
        clock.advance_millis(10_001);
        assert!(latencies.mean() > 0.0);

        latencies.reset();
        assert_eq!(latencies.mean(), 0.0);
        clock.advance_millis(10_001);
        assert_eq!(latencies.mean(), 0.0);
    }
}
