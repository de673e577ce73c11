use super::barrier::SequenceBarrier;
use super::buffer::RingBuffer;
use super::panic_message;
use super::sequence::Sequence;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error};

/// Consumer in a work-pool stage: each slot goes to exactly one worker.
pub trait WorkHandler<T>: Send {
    fn on_event(&mut self, event: &mut T, sequence: i64);

    fn on_start(&mut self) {}

    fn on_shutdown(&mut self) {}
}

impl<T, F> WorkHandler<T> for F
where
    F: FnMut(&mut T, i64) + Send,
{
    fn on_event(&mut self, event: &mut T, sequence: i64) {
        self(event, sequence);
    }
}

/// One worker of a work pool.
///
/// Workers claim slots by advancing the pool's shared `work_sequence` with a
/// compare-and-set. Before claiming, a worker moves its own `sequence` to just
/// below the claim, which tells the producer (and any later stage) that it is
/// finished with everything before that point.
pub(crate) struct WorkProcessor<T> {
    name: String,
    ring: Arc<RingBuffer<T>>,
    barrier: SequenceBarrier,
    sequence: Arc<Sequence>,
    work_sequence: Arc<Sequence>,
    handler: Box<dyn WorkHandler<T>>,
}

impl<T> WorkProcessor<T> {
    pub(crate) fn new(
        name: String,
        ring: Arc<RingBuffer<T>>,
        barrier: SequenceBarrier,
        sequence: Arc<Sequence>,
        work_sequence: Arc<Sequence>,
        handler: Box<dyn WorkHandler<T>>,
    ) -> Self {
        Self {
            name,
            ring,
            barrier,
            sequence,
            work_sequence,
            handler,
        }
    }

    pub(crate) fn run(mut self) {
        debug!(worker = %self.name, "Worker thread started");
        self.handler.on_start();

        let mut processed = 0u64;
        let mut claim_next = true;
        let mut cached_available = i64::MIN;
        let mut next = self.sequence.get();

        loop {
            if claim_next {
                claim_next = false;
                loop {
                    next = self.work_sequence.get() + 1;
                    self.sequence.set(next - 1);
                    if self.work_sequence.compare_and_set(next - 1, next) {
                        break;
                    }
                }
            }

            if cached_available >= next {
                // SAFETY: `next` was claimed by this worker alone through the
                // CAS above, and the barrier has released it. The producer
                // gates on `self.sequence`, which stays below `next` until the
                // next claim.
                #[allow(unsafe_code)]
                let event = unsafe { &mut *self.ring.slot_ptr(next) };
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    self.handler.on_event(event, next);
                }));
                if let Err(panic) = outcome {
                    error!(
                        worker = %self.name,
                        sequence = next,
                        panic_message = %panic_message(panic.as_ref()),
                        "Work handler panicked"
                    );
                }
                processed += 1;
                claim_next = true;
            } else {
                match self.barrier.wait_for(next) {
                    Ok(available) => cached_available = available,
                    Err(_) => break,
                }
            }
        }

        self.handler.on_shutdown();
        debug!(worker = %self.name, processed, "Worker thread exiting");
    }
}
