//! # smack
//!
//! **smack** is a staged request-dispatch core: requests are published into a
//! pre-allocated ring buffer and flow through routing, deserialization,
//! invocation and serialization stages running on dedicated threads.
//!
//! ## Overview
//!
//! The transport (out of scope here) decodes an HTTP request and calls
//! [`Pipeline::publish`]. From there:
//!
//! 1. the **routing** stage resolves the endpoint and binds `{name}` path
//!    variables against a compiled segment tree
//! 2. the **deserialization** stage decodes the body with the endpoint's
//!    strategy
//! 3. the **invocation** stage runs the endpoint, wrapped in a transaction
//!    when the endpoint is transactional
//! 4. the **serialization** work pool encodes the result and hands
//!    `(status, headers, body)` back to the connection's [`ResponseWriter`],
//!    in the order the connection's requests arrived
//!
//! ## Architecture
//!
//! - **[`ring`]** - sequences, barriers, wait strategies, broadcast stages and work pools
//! - **[`pipeline`]** - request slot, stage handlers, ordered output, the producer
//! - **[`router`]** - route registration and the compiled route table
//! - **[`endpoint`]** - the endpoint contract and transaction collaborator
//! - **[`strategy`]** - pluggable body (de)serialization
//! - **[`error`]** - error types for every layer
//! - **[`runtime_config`]** - `SMACK_*` environment configuration
//! - **[`logging`]** - `tracing` subscriber setup
//!
//! ## Quick Start
//!
//! ```
//! use http::Method;
//! use serde_json::json;
//! use smack::endpoint::{FnEndpoint, NoTransactions};
//! use smack::pipeline::{IncomingRequest, OutputChannel, Pipeline, Response, ResponseWriter};
//! use smack::router::RoutingDefinition;
//! use smack::runtime_config::PipelineConfig;
//! use smack::strategy::JsonSerialization;
//! use std::sync::Arc;
//!
//! struct Sink;
//! impl ResponseWriter for Sink {
//!     fn write_response(&self, _connection: u64, response: &Response<'_>) -> std::io::Result<()> {
//!         assert_eq!(response.status, 200);
//!         Ok(())
//!     }
//! }
//!
//! let mut routes = RoutingDefinition::new();
//! routes.add_route(
//!     "/db/data/node/{id}",
//!     Arc::new(
//!         FnEndpoint::new(Method::GET, |inv, out| {
//!             out.ok(json!({ "id": inv.path_variable("id") }));
//!             Ok(())
//!         })
//!         .with_serialization(JsonSerialization),
//!     ),
//! );
//!
//! let mut pipeline = Pipeline::start(
//!     routes.compile_routes()?,
//!     PipelineConfig::default(),
//!     Arc::new(NoTransactions),
//! )?;
//! let channel = OutputChannel::new(1, Arc::new(Sink));
//! pipeline.publish(IncomingRequest::new(&Method::GET, "/db/data/node/7", b"", &channel));
//! pipeline.shutdown();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Configuration
//!
//! See [`runtime_config`] for `SMACK_RING_SIZE`, `SMACK_WAIT_STRATEGY` and
//! `SMACK_SERIALIZATION_WORKERS`, and [`logging`] for `SMACK_LOG_*`.
//!
//! [`Pipeline::publish`]: pipeline::Pipeline::publish
//! [`ResponseWriter`]: pipeline::ResponseWriter

pub mod endpoint;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod ring;
pub mod router;
pub mod runtime_config;
pub mod strategy;

pub use endpoint::{Endpoint, FnEndpoint, Invocation, InvocationResponse, TransactionManager};
pub use error::{DispatchError, PipelineError, RouteError};
pub use pipeline::{IncomingRequest, OutputChannel, Pipeline, PipelineStats, Response, ResponseWriter};
pub use router::{RoutingDefinition, Router};
pub use runtime_config::PipelineConfig;
