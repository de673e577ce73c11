use super::barrier::SequenceBarrier;
use super::buffer::RingBuffer;
use super::processor::{BatchEventProcessor, EventHandler};
use super::sequence::{min_sequence, Sequence};
use super::sequencer::Sequencer;
use super::wait::{WaitStrategy, Waiter};
use super::work_pool::{WorkHandler, WorkProcessor};
use crate::error::PipelineError;
use crossbeam_utils::Backoff;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{error, info};

enum Stage<T> {
    Broadcast {
        name: String,
        handlers: Vec<Box<dyn EventHandler<T>>>,
    },
    WorkPool {
        name: String,
        handlers: Vec<Box<dyn WorkHandler<T>>>,
    },
}

impl<T> Stage<T> {
    fn name(&self) -> &str {
        match self {
            Stage::Broadcast { name, .. } | Stage::WorkPool { name, .. } => name,
        }
    }
}

/// Declares a ring and its consumer topology.
///
/// Stages run in the order they are added; each stage only sees a slot after
/// the previous stage has finished with it. The producer is gated on the
/// last stage.
///
/// ```
/// use smack::ring::{RingBuilder, WaitStrategy};
///
/// let (mut publisher, running) = RingBuilder::new("demo", 8, WaitStrategy::Yielding, || 0u64)
///     .handle_with("double", |v: &mut u64, _seq: i64, _eob: bool| *v *= 2)
///     .start()
///     .unwrap();
/// publisher.publish_with(|slot, _| *slot = 21);
/// running.shutdown();
/// ```
pub struct RingBuilder<T> {
    name: String,
    capacity: usize,
    wait_strategy: WaitStrategy,
    factory: Box<dyn FnMut() -> T>,
    stages: Vec<Stage<T>>,
}

impl<T: Send + 'static> RingBuilder<T> {
    pub fn new(
        name: &str,
        capacity: usize,
        wait_strategy: WaitStrategy,
        factory: impl FnMut() -> T + 'static,
    ) -> Self {
        Self {
            name: name.to_owned(),
            capacity,
            wait_strategy,
            factory: Box::new(factory),
            stages: Vec::new(),
        }
    }

    /// Add a broadcast stage. Every handler sees every slot, in the order the
    /// handlers are listed, on one thread.
    #[must_use]
    pub fn broadcast(mut self, name: &str, handlers: Vec<Box<dyn EventHandler<T>>>) -> Self {
        self.stages.push(Stage::Broadcast {
            name: name.to_owned(),
            handlers,
        });
        self
    }

    /// Add a broadcast stage with a single handler.
    #[must_use]
    pub fn handle_with(self, name: &str, handler: impl EventHandler<T> + 'static) -> Self {
        self.broadcast(name, vec![Box::new(handler)])
    }

    /// Add a work-pool stage: one thread per handler, each slot handled by
    /// exactly one of them.
    #[must_use]
    pub fn work_pool(mut self, name: &str, handlers: Vec<Box<dyn WorkHandler<T>>>) -> Self {
        self.stages.push(Stage::WorkPool {
            name: name.to_owned(),
            handlers,
        });
        self
    }

    /// Allocate the ring and spawn one thread per broadcast stage and per
    /// work-pool worker.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::InvalidRingSize`] for a capacity that is not a power of two
    /// - [`PipelineError::InvalidWorkerCount`] when there are no stages or a stage has no handlers
    /// - [`PipelineError::ThreadSpawn`] if the OS refuses a thread; threads
    ///   already started are stopped first
    pub fn start(self) -> Result<(Publisher<T>, RunningRing), PipelineError> {
        let RingBuilder {
            name,
            capacity,
            wait_strategy,
            factory,
            stages,
        } = self;

        if stages.is_empty() {
            return Err(PipelineError::InvalidWorkerCount(0));
        }
        for stage in &stages {
            let count = match stage {
                Stage::Broadcast { handlers, .. } => handlers.len(),
                Stage::WorkPool { handlers, .. } => handlers.len(),
            };
            if count == 0 {
                return Err(PipelineError::InvalidWorkerCount(0));
            }
        }

        let ring = Arc::new(RingBuffer::new(capacity, factory)?);
        let waiter = Arc::new(Waiter::new(wait_strategy));
        let cursor = Arc::new(Sequence::default());
        let alerted = Arc::new(AtomicBool::new(false));

        let mut running = RunningRing {
            name: name.clone(),
            cursor: Arc::clone(&cursor),
            gating: Vec::new(),
            waiter: Arc::clone(&waiter),
            alerted: Arc::clone(&alerted),
            threads: Vec::new(),
        };

        let mut upstream: Vec<Arc<Sequence>> = Vec::new();
        for stage in stages {
            let stage_name = stage.name().to_owned();
            let barrier = || {
                SequenceBarrier::new(
                    Arc::clone(&cursor),
                    upstream.clone(),
                    Arc::clone(&waiter),
                    Arc::clone(&alerted),
                )
            };

            match stage {
                Stage::Broadcast { handlers, .. } => {
                    let barrier = barrier();
                    let sequence = Arc::new(Sequence::default());
                    let thread_name = format!("{name}-{stage_name}-0");
                    let processor = BatchEventProcessor::new(
                        thread_name.clone(),
                        Arc::clone(&ring),
                        barrier,
                        Arc::clone(&sequence),
                        handlers,
                    );
                    running.spawn(thread_name, move || processor.run())?;
                    upstream = vec![sequence];
                }
                Stage::WorkPool { handlers, .. } => {
                    let work_sequence = Arc::new(Sequence::default());
                    let mut sequences = Vec::with_capacity(handlers.len());
                    for (index, handler) in handlers.into_iter().enumerate() {
                        let sequence = Arc::new(Sequence::default());
                        let barrier = barrier();
                        let thread_name = format!("{name}-{stage_name}-{index}");
                        let processor = WorkProcessor::new(
                            thread_name.clone(),
                            Arc::clone(&ring),
                            barrier,
                            Arc::clone(&sequence),
                            Arc::clone(&work_sequence),
                            handler,
                        );
                        running.spawn(thread_name, move || processor.run())?;
                        sequences.push(sequence);
                    }
                    upstream = sequences;
                }
            }
        }

        running.gating = upstream.clone();
        info!(
            ring = %name,
            capacity,
            wait_strategy = wait_strategy.as_str(),
            threads = running.threads.len(),
            "Ring started"
        );

        let publisher = Publisher {
            ring,
            sequencer: Sequencer::new(capacity, cursor, upstream, waiter),
        };
        Ok((publisher, running))
    }
}

/// The single producer side of a ring.
///
/// Not `Clone`: exactly one publisher exists per ring, and claiming a slot
/// takes `&mut self`.
pub struct Publisher<T> {
    ring: Arc<RingBuffer<T>>,
    sequencer: Sequencer,
}

impl<T> Publisher<T> {
    /// Claim the next slot, let `fill` write into it, and publish it.
    /// Waits while the ring is full.
    ///
    /// `fill` must not panic: a claimed slot that is never published stalls
    /// every consumer.
    pub fn publish_with<F>(&mut self, fill: F) -> i64
    where
        F: FnOnce(&mut T, i64),
    {
        let sequence = self.sequencer.next();
        self.fill_and_publish(sequence, fill);
        sequence
    }

    /// Like [`Publisher::publish_with`], but fails instead of waiting.
    ///
    /// # Errors
    ///
    /// [`PipelineError::RingFull`] when no slot is free; `fill` is not called.
    pub fn try_publish_with<F>(&mut self, fill: F) -> Result<i64, PipelineError>
    where
        F: FnOnce(&mut T, i64),
    {
        let sequence = self.sequencer.try_next().ok_or(PipelineError::RingFull)?;
        self.fill_and_publish(sequence, fill);
        Ok(sequence)
    }

    fn fill_and_publish<F>(&mut self, sequence: i64, fill: F)
    where
        F: FnOnce(&mut T, i64),
    {
        // SAFETY: the sequencer only hands out `sequence` once every final
        // stage has moved past the previous lap of this slot, and consumers
        // cannot reach it until the cursor is published below.
        #[allow(unsafe_code)]
        let slot = unsafe { &mut *self.ring.slot_ptr(sequence) };
        fill(slot, sequence);
        self.sequencer.publish(sequence);
    }

    /// Highest published sequence.
    #[must_use]
    pub fn cursor(&self) -> i64 {
        self.sequencer.cursor()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// Free slots; zero means the next `publish_with` would wait.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        usize::try_from(self.sequencer.remaining_capacity()).unwrap_or(0)
    }
}

impl<T> std::fmt::Debug for Publisher<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Publisher")
            .field("capacity", &self.ring.capacity())
            .field("cursor", &self.sequencer.cursor())
            .finish()
    }
}

/// Handle to a ring's consumer threads.
///
/// Dropping it without calling [`RunningRing::shutdown`] still drains and
/// joins.
#[derive(Debug)]
pub struct RunningRing {
    name: String,
    cursor: Arc<Sequence>,
    gating: Vec<Arc<Sequence>>,
    waiter: Arc<Waiter>,
    alerted: Arc<AtomicBool>,
    threads: Vec<JoinHandle<()>>,
}

impl RunningRing {
    fn spawn<F>(&mut self, thread_name: String, body: F) -> Result<(), PipelineError>
    where
        F: FnOnce() + Send + 'static,
    {
        match std::thread::Builder::new().name(thread_name.clone()).spawn(body) {
            Ok(handle) => {
                self.threads.push(handle);
                Ok(())
            }
            Err(e) => {
                error!(thread = %thread_name, error = %e, "Failed to spawn stage thread");
                self.halt();
                Err(PipelineError::ThreadSpawn(e.to_string()))
            }
        }
    }

    /// Number of consumer threads.
    #[must_use]
    pub fn thread_count(&self) -> usize {
        self.threads.len()
    }

    /// Wait until every published slot has passed the last stage, then stop
    /// and join all consumer threads.
    pub fn shutdown(mut self) {
        self.drain();
        self.halt();
    }

    fn drain(&self) {
        let target = self.cursor.get();
        let backoff = Backoff::new();
        while min_sequence(&self.gating, target) < target {
            self.waiter.pause(&backoff);
        }
    }

    fn halt(&mut self) {
        if self.threads.is_empty() {
            return;
        }
        self.alerted.store(true, Ordering::Release);
        self.waiter.signal_all();
        let count = self.threads.len();
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                error!(ring = %self.name, "Stage thread terminated by panic");
            }
        }
        info!(ring = %self.name, threads = count, "Ring stopped");
    }
}

impl Drop for RunningRing {
    fn drop(&mut self) {
        if !self.threads.is_empty() {
            self.drain();
            self.halt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn test_start_rejects_empty_topology() {
        let err = RingBuilder::new("t", 8, WaitStrategy::Yielding, || 0u8)
            .start()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWorkerCount(0)));

        let err = RingBuilder::new("t", 8, WaitStrategy::Yielding, || 0u8)
            .work_pool("w", Vec::new())
            .start()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidWorkerCount(0)));
    }

    #[test]
    fn test_start_rejects_bad_capacity() {
        let err = RingBuilder::new("t", 100, WaitStrategy::Yielding, || 0u8)
            .handle_with("s", |_: &mut u8, _: i64, _: bool| {})
            .start()
            .unwrap_err();
        assert!(matches!(err, PipelineError::InvalidRingSize(100)));
    }

    #[test]
    fn test_handler_panic_does_not_stop_stage() {
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        let (mut publisher, running) = RingBuilder::new("t", 8, WaitStrategy::Yielding, || 0u64)
            .handle_with("boom", |v: &mut u64, _: i64, _: bool| {
                if *v == 3 {
                    panic!("bad slot");
                }
            })
            .handle_with("count", move |_: &mut u64, _: i64, _: bool| {
                counter.fetch_add(1, Ordering::Relaxed);
            })
            .start()
            .unwrap();

        for i in 0..20u64 {
            publisher.publish_with(|slot, _| *slot = i);
        }
        running.shutdown();
        assert_eq!(seen.load(Ordering::Relaxed), 20);
    }

    #[test]
    fn test_thread_count() {
        let (_publisher, running) = RingBuilder::new("named", 8, WaitStrategy::Sleeping, || 0u8)
            .handle_with("first", |_: &mut u8, _: i64, _: bool| {})
            .work_pool(
                "pool",
                vec![
                    Box::new(|_: &mut u8, _: i64| {}) as Box<dyn WorkHandler<u8>>,
                    Box::new(|_: &mut u8, _: i64| {}) as Box<dyn WorkHandler<u8>>,
                ],
            )
            .start()
            .unwrap();
        assert_eq!(running.thread_count(), 3);
        running.shutdown();
    }
}
