use super::event::{IncomingRequest, RequestEvent};
use super::stages::{
    DeserializationHandler, InvocationHandler, RoutingHandler, SerializationHandler,
};
use super::stats::{PipelineCounters, PipelineStats};
use crate::endpoint::TransactionManager;
use crate::error::PipelineError;
use crate::ring::{Publisher, RingBuilder, RunningRing, WorkHandler};
use crate::router::Router;
use crate::runtime_config::PipelineConfig;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

/// Name of the pipeline's ring, used as the prefix of every stage thread.
pub const RING_NAME: &str = "smack";

/// Running dispatch pipeline.
///
/// Owns the single producer side of the ring. The transport calls
/// [`Pipeline::publish`] for every decoded request; responses come back
/// through each request's [`OutputChannel`](super::OutputChannel).
#[derive(Debug)]
pub struct Pipeline {
    publisher: Publisher<RequestEvent>,
    running: RunningRing,
    counters: Arc<PipelineCounters>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Validate `config`, allocate the ring and start the stage threads:
    /// routing, deserialization and invocation (one thread each), then
    /// `serialization_workers` serialization threads.
    ///
    /// # Errors
    ///
    /// Any [`PipelineError`] from validation or thread start-up.
    pub fn start(
        router: Router,
        config: PipelineConfig,
        transactions: Arc<dyn TransactionManager>,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        let counters = Arc::new(PipelineCounters::default());
        let workers = (0..config.serialization_workers)
            .map(|_| {
                Box::new(SerializationHandler::new(Arc::clone(&counters)))
                    as Box<dyn WorkHandler<RequestEvent>>
            })
            .collect();

        let routes = router.len();
        let (publisher, running) = RingBuilder::new(
            RING_NAME,
            config.ring_size,
            config.wait_strategy,
            RequestEvent::default,
        )
        .handle_with("routing", RoutingHandler::new(router))
        .handle_with("deserialization", DeserializationHandler)
        .handle_with("invocation", InvocationHandler::new(transactions))
        .work_pool("serialization", workers)
        .start()?;

        info!(
            ring_size = config.ring_size,
            wait_strategy = config.wait_strategy.as_str(),
            serialization_workers = config.serialization_workers,
            routes,
            "Pipeline started"
        );

        Ok(Self {
            publisher,
            running,
            counters,
            config,
        })
    }

    /// Copy `request` into the next free slot and publish it.
    ///
    /// Waits while the ring is full. Returns the slot's sequence.
    pub fn publish(&mut self, request: IncomingRequest<'_>) -> i64 {
        let sequence = self
            .publisher
            .publish_with(|slot, _| slot.load(&request));
        self.counters.published.fetch_add(1, Ordering::Relaxed);
        sequence
    }

    /// Like [`Pipeline::publish`], but never waits.
    ///
    /// # Errors
    ///
    /// [`PipelineError::RingFull`] when every slot is in flight. The request
    /// is not consumed and the channel's ordering is unaffected.
    pub fn try_publish(&mut self, request: IncomingRequest<'_>) -> Result<i64, PipelineError> {
        let sequence = self
            .publisher
            .try_publish_with(|slot, _| slot.load(&request))?;
        self.counters.published.fetch_add(1, Ordering::Relaxed);
        Ok(sequence)
    }

    #[must_use]
    pub fn stats(&self) -> PipelineStats {
        self.counters.snapshot()
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Slots free for publishing right now.
    #[must_use]
    pub fn remaining_capacity(&self) -> usize {
        self.publisher.remaining_capacity()
    }

    /// Finish every published request, then stop and join the stage threads.
    pub fn shutdown(self) {
        let Pipeline {
            running, counters, ..
        } = self;
        running.shutdown();
        let stats = counters.snapshot();
        info!(
            published = stats.published,
            completed = stats.completed,
            failed = stats.failed,
            write_errors = stats.write_errors,
            "Pipeline stopped"
        );
    }
}
