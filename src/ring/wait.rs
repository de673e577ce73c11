use super::sequence::{min_sequence, Sequence};
use crossbeam_utils::Backoff;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How long a blocked consumer sleeps before re-checking the cursor.
const BLOCKING_TIMEOUT: Duration = Duration::from_millis(1);

/// Sleep used once spinning and yielding have not paid off.
const SLEEP_STEP: Duration = Duration::from_micros(50);

/// How threads wait for a sequence to become available.
///
/// Picked per deployment profile: `BusySpin` for the lowest latency when
/// stage threads have dedicated cores, `Blocking` for the lowest CPU use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
    /// Spin on the counter with a CPU pause hint
    BusySpin,
    /// Spin briefly, then yield the thread
    #[default]
    Yielding,
    /// Spin, yield, then sleep in short steps
    Sleeping,
    /// Park on a condition variable signalled by the producer
    Blocking,
}

impl WaitStrategy {
    /// Parse a wait strategy from its configuration name
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "busy-spin" | "busy_spin" | "busyspin" | "spin" => Some(Self::BusySpin),
            "yielding" | "yield" => Some(Self::Yielding),
            "sleeping" | "sleep" => Some(Self::Sleeping),
            "blocking" | "block" => Some(Self::Blocking),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BusySpin => "busy-spin",
            Self::Yielding => "yielding",
            Self::Sleeping => "sleeping",
            Self::Blocking => "blocking",
        }
    }
}

/// Raised by a barrier once the ring has been halted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Alerted;

/// Shared wait state for one ring.
#[derive(Debug)]
pub(crate) struct Waiter {
    strategy: WaitStrategy,
    lock: Mutex<()>,
    cond: Condvar,
}

impl Waiter {
    pub(crate) fn new(strategy: WaitStrategy) -> Self {
        Self {
            strategy,
            lock: Mutex::new(()),
            cond: Condvar::new(),
        }
    }

    /// Wait until `sequence` is published and every dependent has processed
    /// it. Returns the highest sequence that is safe to read.
    pub(crate) fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependents: &[Arc<Sequence>],
        alerted: &AtomicBool,
    ) -> Result<i64, Alerted> {
        if self.strategy == WaitStrategy::Blocking && cursor.get() < sequence {
            let mut guard = self.lock.lock();
            while cursor.get() < sequence {
                if alerted.load(Ordering::Acquire) {
                    return Err(Alerted);
                }
                self.cond.wait_for(&mut guard, BLOCKING_TIMEOUT);
            }
        }

        let backoff = Backoff::new();
        loop {
            if alerted.load(Ordering::Acquire) {
                return Err(Alerted);
            }
            let available = if dependents.is_empty() {
                cursor.get()
            } else {
                min_sequence(dependents, cursor.get())
            };
            if available >= sequence {
                return Ok(available);
            }
            self.pause(&backoff);
        }
    }

    /// One idle step while spinning on some condition.
    pub(crate) fn pause(&self, backoff: &Backoff) {
        match self.strategy {
            WaitStrategy::BusySpin => std::hint::spin_loop(),
            WaitStrategy::Yielding => backoff.snooze(),
            WaitStrategy::Sleeping | WaitStrategy::Blocking => {
                if backoff.is_completed() {
                    std::thread::sleep(SLEEP_STEP);
                } else {
                    backoff.snooze();
                }
            }
        }
    }

    /// Wake consumers parked by the blocking strategy.
    pub(crate) fn signal_all(&self) {
        if self.strategy == WaitStrategy::Blocking {
            let _guard = self.lock.lock();
            self.cond.notify_all();
        }
    }
}
