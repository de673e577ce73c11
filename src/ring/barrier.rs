use super::sequence::Sequence;
use super::wait::{Alerted, Waiter};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Gate a consumer waits on before reading a slot.
///
/// A slot is readable once the producer has published it and every upstream
/// stage in `dependents` has finished with it. With no dependents the consumer
/// reads straight behind the producer cursor.
#[derive(Debug)]
pub(crate) struct SequenceBarrier {
    cursor: Arc<Sequence>,
    dependents: Vec<Arc<Sequence>>,
    waiter: Arc<Waiter>,
    alerted: Arc<AtomicBool>,
}

impl SequenceBarrier {
    pub(crate) fn new(
        cursor: Arc<Sequence>,
        dependents: Vec<Arc<Sequence>>,
        waiter: Arc<Waiter>,
        alerted: Arc<AtomicBool>,
    ) -> Self {
        Self {
            cursor,
            dependents,
            waiter,
            alerted,
        }
    }

    /// Block until `sequence` is readable; returns the highest readable
    /// sequence, which may be well past `sequence`.
    #[inline]
    pub(crate) fn wait_for(&self, sequence: i64) -> Result<i64, Alerted> {
        self.waiter
            .wait_for(sequence, &self.cursor, &self.dependents, &self.alerted)
    }
}
