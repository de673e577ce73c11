//! # Runtime Configuration Module
//!
//! Environment variable-based configuration for the dispatch pipeline.
//!
//! ## Environment Variables
//!
//! ### `SMACK_RING_SIZE`
//!
//! Number of request slots in the ring. Must be a power of two. Accepts
//! decimal (`4096`) or hexadecimal (`0x1000`).
//!
//! Default: `1024`
//!
//! **Why this matters:**
//! - The ring is the only buffer between the transport and the endpoints
//! - A full ring makes the producer wait (or `try_publish` fail)
//! - Every slot keeps its buffers' capacity, so memory is roughly
//!   `ring_size × largest request/response seen`
//!
//! ### `SMACK_WAIT_STRATEGY`
//!
//! How idle stage threads wait: `busy-spin`, `yielding`, `sleeping` or
//! `blocking`.
//!
//! Default: `yielding`
//!
//! ### `SMACK_SERIALIZATION_WORKERS`
//!
//! Threads in the serialization work pool.
//!
//! Default: available parallelism, capped at 4
//!
//! ## Usage
//!
//! ```rust
//! use smack::runtime_config::PipelineConfig;
//!
//! let config = PipelineConfig::from_env();
//! println!("Ring size: {} slots", config.ring_size);
//! ```
//!
//! ## Example Configuration
//!
//! ```bash
//! export SMACK_RING_SIZE=0x4000
//! export SMACK_WAIT_STRATEGY=busy-spin
//! export SMACK_SERIALIZATION_WORKERS=2
//! ```
//!
//! Recommended profiles:
//! - Dedicated cores, lowest latency: `busy-spin`
//! - Shared host: `yielding` or `sleeping`
//! - Mostly idle service: `blocking`

use crate::error::PipelineError;
use crate::ring::WaitStrategy;
use std::env;
use tracing::warn;

/// Default number of ring slots.
pub const DEFAULT_RING_SIZE: usize = 1024;

/// Upper bound for the default serialization worker count.
pub const MAX_DEFAULT_SERIALIZATION_WORKERS: usize = 4;

/// Pipeline configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Slots in the ring (power of two, default 1024)
    pub ring_size: usize,
    /// How idle stage threads wait (default yielding)
    pub wait_strategy: WaitStrategy,
    /// Threads in the serialization work pool
    pub serialization_workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ring_size: DEFAULT_RING_SIZE,
            wait_strategy: WaitStrategy::default(),
            serialization_workers: default_serialization_workers(),
        }
    }
}

impl PipelineConfig {
    /// Explicit configuration; call [`PipelineConfig::validate`] or let
    /// `Pipeline::start` do it.
    #[must_use]
    pub fn new(ring_size: usize, wait_strategy: WaitStrategy, serialization_workers: usize) -> Self {
        Self {
            ring_size,
            wait_strategy,
            serialization_workers,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the default with a warning; range
    /// checks are left to [`PipelineConfig::validate`].
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let ring_size = match env::var("SMACK_RING_SIZE") {
            Ok(val) => parse_size(&val).unwrap_or_else(|| {
                warn!(value = %val, default = defaults.ring_size, "Invalid SMACK_RING_SIZE, using default");
                defaults.ring_size
            }),
            Err(_) => defaults.ring_size,
        };

        let wait_strategy = match env::var("SMACK_WAIT_STRATEGY") {
            Ok(val) => WaitStrategy::parse(&val).unwrap_or_else(|| {
                warn!(value = %val, "Unknown SMACK_WAIT_STRATEGY, using yielding");
                defaults.wait_strategy
            }),
            Err(_) => defaults.wait_strategy,
        };

        let serialization_workers = match env::var("SMACK_SERIALIZATION_WORKERS") {
            Ok(val) => val.trim().parse().ok().unwrap_or_else(|| {
                warn!(
                    value = %val,
                    default = defaults.serialization_workers,
                    "Invalid SMACK_SERIALIZATION_WORKERS, using default"
                );
                defaults.serialization_workers
            }),
            Err(_) => defaults.serialization_workers,
        };

        Self {
            ring_size,
            wait_strategy,
            serialization_workers,
        }
    }

    /// # Errors
    ///
    /// - [`PipelineError::InvalidRingSize`] unless `ring_size` is a non-zero power of two
    /// - [`PipelineError::InvalidWorkerCount`] when `serialization_workers` is zero
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.ring_size == 0 || !self.ring_size.is_power_of_two() {
            return Err(PipelineError::InvalidRingSize(self.ring_size));
        }
        if self.serialization_workers == 0 {
            return Err(PipelineError::InvalidWorkerCount(0));
        }
        Ok(())
    }
}

fn default_serialization_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
        .min(MAX_DEFAULT_SERIALIZATION_WORKERS)
}

fn parse_size(val: &str) -> Option<usize> {
    let val = val.trim();
    if let Some(hex) = val.strip_prefix("0x") {
        usize::from_str_radix(hex, 16).ok()
    } else {
        val.parse().ok()
    }
}
