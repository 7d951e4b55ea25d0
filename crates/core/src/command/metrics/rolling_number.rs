//! Rolling event counters over a trailing time window.

use std::sync::Arc;
use std::time::Duration;

use bulwark_common::time::{Clock, SystemClock};
use parking_lot::Mutex;

use super::bucket::{BucketRing, EventCounts};
use crate::command::event::EventType;

/// Counts events per [`EventType`] over the last `window_length`.
pub struct RollingNumber<C: Clock = SystemClock> {
    clock: Arc<C>,
    ring: Mutex<BucketRing<EventCounts>>,
}

impl<C: Clock> std::fmt::Debug for RollingNumber<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RollingNumber").field("active_buckets", &self.active_buckets()).finish()
    }
}

impl<C: Clock> RollingNumber<C> {
    pub fn new(window_length: Duration, bucket_count: usize, clock: Arc<C>) -> Self {
        let ring = BucketRing::new(window_length, bucket_count, clock.now(), EventCounts::default);
        Self { clock, ring: Mutex::new(ring) }
    }

    pub fn increment(&self, event: EventType) {
        let now = self.clock.now();
        let mut ring = self.ring.lock();
        ring.rotate(now);
        ring.current_mut().increment(event);
    }

    /// Sum of `event` across every bucket inside the window.
    pub fn sum(&self, event: EventType) -> u64 {
        self.totals().get(event)
    }

    /// Sums of every event type, taken under a single lock.
    pub fn totals(&self) -> EventCounts {
        let now = self.clock.now();
        let mut ring = self.ring.lock();
        ring.rotate(now);

        let mut totals = EventCounts::default();
        for counts in ring.within_window(now) {
            totals.accumulate(counts);
        }
        totals
    }

    pub fn reset(&self) {
        let now = self.clock.now();
        self.ring.lock().reset(now);
    }

    /// Number of buckets the window has rotated through, capped at the
    /// bucket count.
    pub fn active_buckets(&self) -> usize {
        let now = self.clock.now();
        let mut ring = self.ring.lock();
        ring.rotate(now);
        ring.active()
    }
}
