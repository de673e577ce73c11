use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters updated by the producer and the serialization workers.
#[derive(Debug, Default)]
pub(crate) struct PipelineCounters {
    pub(crate) published: AtomicU64,
    pub(crate) completed: AtomicU64,
    pub(crate) failed: AtomicU64,
    pub(crate) write_errors: AtomicU64,
}

impl PipelineCounters {
    pub(crate) fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            published: self.published.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the pipeline counters.
///
/// The fields are read independently, so under load they may be a few
/// requests apart from each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    /// Requests accepted by `publish` / `try_publish`
    pub published: u64,
    /// Responses handed to a writer (successful or error responses)
    pub completed: u64,
    /// Completed responses that carry an error status from a failed stage
    pub failed: u64,
    /// Responses the writer rejected
    pub write_errors: u64,
}

impl PipelineStats {
    /// Published requests whose response has not been written yet.
    #[must_use]
    pub fn in_flight(&self) -> u64 {
        self.published.saturating_sub(self.completed)
    }
}
