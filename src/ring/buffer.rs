use crate::error::PipelineError;
use std::cell::UnsafeCell;

/// Fixed-capacity circular array of reusable slots.
///
/// Slots are created once by a factory and never reallocated. Access is not
/// synchronized here: which thread may touch which slot is decided entirely by
/// the sequence barriers, so all accessors hand out raw pointers and the
/// callers carry the safety argument.
pub struct RingBuffer<T> {
    slots: Box<[UnsafeCell<T>]>,
    mask: usize,
}

// SAFETY: a slot is only dereferenced by the single thread that currently owns
// its sequence (producer, one broadcast processor, or the one worker that
// claimed it). Ownership moves between threads through Release/Acquire on the
// sequence counters, so T only has to be Send.
#[allow(unsafe_code)]
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Allocate `capacity` slots, filled by `factory`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidRingSize`] unless `capacity` is a non-zero
    /// power of two.
    pub fn new(capacity: usize, mut factory: impl FnMut() -> T) -> Result<Self, PipelineError> {
        if capacity == 0 || !capacity.is_power_of_two() {
            return Err(PipelineError::InvalidRingSize(capacity));
        }
        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(factory()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        Ok(Self {
            slots,
            mask: capacity - 1,
        })
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Raw pointer to the slot for `sequence`.
    ///
    /// Dereferencing it is only sound while the caller owns `sequence`
    /// according to the ring's barriers.
    #[inline]
    pub(crate) fn slot_ptr(&self, sequence: i64) -> *mut T {
        // Sequences are never negative once claimed.
        let index = (sequence as usize) & self.mask;
        self.slots[index].get()
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("capacity", &self.slots.len())
            .finish_non_exhaustive()
    }
}
