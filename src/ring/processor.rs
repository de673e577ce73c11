use super::barrier::SequenceBarrier;
use super::buffer::RingBuffer;
use super::panic_message;
use super::sequence::Sequence;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Consumer in a broadcast stage: sees every slot, in sequence order.
///
/// Handlers registered on the same stage run one after another on the stage
/// thread, so each gets exclusive `&mut` access to the slot.
pub trait EventHandler<T>: Send {
    /// Process the slot at `sequence`. `end_of_batch` is true for the last
    /// slot of the run that was available when the stage woke up.
    fn on_event(&mut self, event: &mut T, sequence: i64, end_of_batch: bool);

    /// Called once on the stage thread before the first event.
    fn on_start(&mut self) {}

    /// Called once on the stage thread after the ring is halted.
    fn on_shutdown(&mut self) {}
}

impl<T, F> EventHandler<T> for F
where
    F: FnMut(&mut T, i64, bool) + Send,
{
    fn on_event(&mut self, event: &mut T, sequence: i64, end_of_batch: bool) {
        self(event, sequence, end_of_batch);
    }
}

/// Runs one broadcast stage on a dedicated thread.
pub(crate) struct BatchEventProcessor<T> {
    name: String,
    ring: Arc<RingBuffer<T>>,
    barrier: SequenceBarrier,
    sequence: Arc<Sequence>,
    handlers: Vec<Box<dyn EventHandler<T>>>,
}

impl<T> BatchEventProcessor<T> {
    pub(crate) fn new(
        name: String,
        ring: Arc<RingBuffer<T>>,
        barrier: SequenceBarrier,
        sequence: Arc<Sequence>,
        handlers: Vec<Box<dyn EventHandler<T>>>,
    ) -> Self {
        Self {
            name,
            ring,
            barrier,
            sequence,
            handlers,
        }
    }

    pub(crate) fn run(mut self) {
        debug!(stage = %self.name, handlers = self.handlers.len(), "Stage thread started");
        for handler in &mut self.handlers {
            handler.on_start();
        }

        let mut next = self.sequence.get() + 1;
        while let Ok(available) = self.barrier.wait_for(next) {
            while next <= available {
                // SAFETY: the barrier returned `available`, so every slot up to
                // it is published and released by upstream stages. Downstream
                // stages and the producer gate on `self.sequence`, which is
                // still below `next`. This thread is the only accessor.
                #[allow(unsafe_code)]
                let event = unsafe { &mut *self.ring.slot_ptr(next) };
                let end_of_batch = next == available;

                for handler in &mut self.handlers {
                    let outcome = catch_unwind(AssertUnwindSafe(|| {
                        handler.on_event(&mut *event, next, end_of_batch);
                    }));
                    if let Err(panic) = outcome {
                        error!(
                            stage = %self.name,
                            sequence = next,
                            panic_message = %panic_message(panic.as_ref()),
                            "Event handler panicked"
                        );
                    }
                }
                next += 1;
            }
            self.sequence.set(available);
        }

        for handler in &mut self.handlers {
            handler.on_shutdown();
        }
        debug!(stage = %self.name, processed = self.sequence.get() + 1, "Stage thread exiting");
    }
}
