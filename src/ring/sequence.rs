use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Value of a sequence before anything has been published or processed.
pub const INITIAL_SEQUENCE: i64 = -1;

/// Monotonically increasing counter shared between a producer and its
/// consumers.
///
/// Padded to a cache line so neighbouring counters owned by different
/// threads do not false-share.
#[derive(Debug)]
pub struct Sequence {
    value: CachePadded<AtomicI64>,
}

impl Sequence {
    #[must_use]
    pub fn new(initial: i64) -> Self {
        Self {
            value: CachePadded::new(AtomicI64::new(initial)),
        }
    }

    #[inline]
    #[must_use]
    pub fn get(&self) -> i64 {
        self.value.load(Ordering::Acquire)
    }

    /// Publish `value`; everything written before this call is visible to a
    /// thread that observes it through [`Sequence::get`].
    #[inline]
    pub fn set(&self, value: i64) {
        self.value.store(value, Ordering::Release);
    }

    #[inline]
    pub fn compare_and_set(&self, expected: i64, new: i64) -> bool {
        self.value
            .compare_exchange(expected, new, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new(INITIAL_SEQUENCE)
    }
}

/// Smallest value among `sequences`, or `fallback` when there are none.
#[must_use]
pub fn min_sequence(sequences: &[Arc<Sequence>], fallback: i64) -> i64 {
    sequences
        .iter()
        .map(|s| s.get())
        .min()
        .unwrap_or(fallback)
}
