//! Time-sliced buckets shared by the rolling counter and percentile windows.
//!
//! A [`BucketRing`] is a fixed circular array of buckets. It advances lazily:
//! every access compares `now` with the start of the current bucket and, once
//! a full bucket duration has passed, steps exactly one slot forward and
//! reinitializes that slot in place. Buckets are never reallocated.

use std::time::{Duration, Instant};

use bulwark_common::RingBuffer;

use crate::command::event::EventType;

/// Payload stored in a bucket, cleared in place when the ring revisits it.
pub(crate) trait BucketPayload {
    fn clear(&mut self);
}

/// Per-bucket event counters, one slot per [`EventType`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts([u64; EventType::COUNT]);

impl EventCounts {
    /// Count recorded for `event`.
    pub fn get(&self, event: EventType) -> u64 {
        self.0[event.index()]
    }

    pub(crate) fn increment(&mut self, event: EventType) {
        let slot = &mut self.0[event.index()];
        *slot = slot.saturating_add(1);
    }

    pub(crate) fn accumulate(&mut self, other: &EventCounts) {
        for (total, count) in self.0.iter_mut().zip(other.0.iter()) {
            *total = total.saturating_add(*count);
        }
    }
}

impl BucketPayload for EventCounts {
    fn clear(&mut self) {
        self.0 = [0; EventType::COUNT];
    }
}

impl BucketPayload for RingBuffer<u64> {
    fn clear(&mut self) {
        RingBuffer::clear(self);
    }
}

#[derive(Debug)]
struct Bucket<P> {
    /// `None` until the ring first rotates into this slot.
    window_start: Option<Instant>,
    payload: P,
}

#[derive(Debug)]
pub(crate) struct BucketRing<P> {
    buckets: Vec<Bucket<P>>,
    bucket_duration: Duration,
    window_length: Duration,
    current: usize,
    active: usize,
}

impl<P: BucketPayload> BucketRing<P> {
    /// Build a ring of `bucket_count` buckets spanning `window_length`, with
    /// the first bucket opened at `now`.
    pub(crate) fn new(
        window_length: Duration,
        bucket_count: usize,
        now: Instant,
        mut make_payload: impl FnMut() -> P,
    ) -> Self {
        let bucket_count = bucket_count.max(1);
        let bucket_duration = window_length / bucket_count as u32;
        let mut buckets: Vec<Bucket<P>> = (0..bucket_count)
            .map(|_| Bucket { window_start: None, payload: make_payload() })
            .collect();
        buckets[0].window_start = Some(now);

        Self { buckets, bucket_duration, window_length, current: 0, active: 1 }
    }

    /// Advance one slot if the current bucket has expired.
    ///
    /// Returns `true` when the ring rotated.
    pub(crate) fn rotate(&mut self, now: Instant) -> bool {
        if let Some(start) = self.buckets[self.current].window_start {
            if now.saturating_duration_since(start) < self.bucket_duration {
                return false;
            }
        }

        self.current = (self.current + 1) % self.buckets.len();
        let bucket = &mut self.buckets[self.current];
        bucket.window_start = Some(now);
        bucket.payload.clear();
        self.active = (self.active + 1).min(self.buckets.len());
        true
    }

    pub(crate) fn current_mut(&mut self) -> &mut P {
        &mut self.buckets[self.current].payload
    }

    /// Payloads of buckets that started no earlier than `now - window_length`.
    ///
    /// A bucket left over from before an idle gap is skipped here even though
    /// its contents are only cleared when rotation next lands on it.
    pub(crate) fn within_window(&self, now: Instant) -> impl Iterator<Item = &P> + '_ {
        let window_length = self.window_length;
        self.buckets.iter().filter_map(move |bucket| match bucket.window_start {
            Some(start) if now.saturating_duration_since(start) <= window_length => {
                Some(&bucket.payload)
            }
            _ => None,
        })
    }

    /// Payloads of every bucket the ring has opened, regardless of age.
    pub(crate) fn allocated(&self) -> impl Iterator<Item = &P> + '_ {
        self.buckets.iter().filter(|b| b.window_start.is_some()).map(|b| &b.payload)
    }

    /// Clear every bucket and restart the ring with a single bucket at `now`.
    pub(crate) fn reset(&mut self, now: Instant) {
        for bucket in &mut self.buckets {
            bucket.window_start = None;
            bucket.payload.clear();
        }
        self.buckets[self.current].window_start = Some(now);
        self.active = 1;
    }

    pub(crate) fn active(&self) -> usize {
        self.active
    }
}
