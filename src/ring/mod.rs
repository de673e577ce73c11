//! # Ring Module
//!
//! Pre-allocated ring buffer with a single producer and a fixed topology of
//! consumer stages, in the style of the LMAX disruptor.
//!
//! ## Topology
//!
//! - **Broadcast stage** - one thread; every handler of the stage sees every
//!   slot in sequence order ([`EventHandler`])
//! - **Work pool** - N threads; each slot is handled by exactly one worker
//!   ([`WorkHandler`])
//!
//! Stages are chained: stage *k* only reads a slot once stage *k-1* has
//! released it, and the producer never laps the last stage. Slots are created
//! once and reused, so steady-state publishing does not allocate.
//!
//! ## Waiting
//!
//! Consumers wait for work according to a [`WaitStrategy`]. Halting the ring
//! alerts every waiting consumer, which then runs its shutdown hook and exits.

mod barrier;
mod buffer;
mod builder;
mod processor;
mod sequence;
mod sequencer;
mod wait;
mod work_pool;

pub use buffer::RingBuffer;
pub use builder::{Publisher, RingBuilder, RunningRing};
pub use processor::EventHandler;
pub use sequence::{min_sequence, Sequence, INITIAL_SEQUENCE};
pub use wait::{Alerted, WaitStrategy};
pub use work_pool::WorkHandler;

use std::any::Any;

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
