use super::sequence::{min_sequence, Sequence};
use super::wait::Waiter;
use crossbeam_utils::Backoff;
use std::sync::Arc;

/// Claims sequences for the single producer.
///
/// The producer never overtakes the slowest final-stage consumer by more than
/// the ring capacity; `next` waits for room and `try_next` refuses instead.
#[derive(Debug)]
pub(crate) struct Sequencer {
    capacity: i64,
    cursor: Arc<Sequence>,
    gating: Vec<Arc<Sequence>>,
    waiter: Arc<Waiter>,
    next_value: i64,
    cached_gating: i64,
}

impl Sequencer {
    pub(crate) fn new(
        capacity: usize,
        cursor: Arc<Sequence>,
        gating: Vec<Arc<Sequence>>,
        waiter: Arc<Waiter>,
    ) -> Self {
        let next_value = cursor.get();
        Self {
            capacity: capacity as i64,
            cursor,
            gating,
            waiter,
            next_value,
            cached_gating: next_value,
        }
    }

    /// Claim the next sequence, waiting while the ring is full.
    pub(crate) fn next(&mut self) -> i64 {
        let next = self.next_value + 1;
        let wrap_point = next - self.capacity;

        if wrap_point > self.cached_gating {
            let backoff = Backoff::new();
            loop {
                let min = min_sequence(&self.gating, self.next_value);
                self.cached_gating = min;
                if wrap_point <= min {
                    break;
                }
                self.waiter.pause(&backoff);
            }
        }

        self.next_value = next;
        next
    }

    /// Claim the next sequence only if a slot is free right now.
    pub(crate) fn try_next(&mut self) -> Option<i64> {
        let next = self.next_value + 1;
        let wrap_point = next - self.capacity;

        if wrap_point > self.cached_gating {
            let min = min_sequence(&self.gating, self.next_value);
            self.cached_gating = min;
            if wrap_point > min {
                return None;
            }
        }

        self.next_value = next;
        Some(next)
    }

    /// Make `sequence` visible to consumers.
    pub(crate) fn publish(&self, sequence: i64) {
        self.cursor.set(sequence);
        self.waiter.signal_all();
    }

    pub(crate) fn cursor(&self) -> i64 {
        self.cursor.get()
    }

    /// Free slots as of the last gating read.
    pub(crate) fn remaining_capacity(&self) -> i64 {
        let consumed = min_sequence(&self.gating, self.next_value);
        self.capacity - (self.next_value - consumed)
    }
}
