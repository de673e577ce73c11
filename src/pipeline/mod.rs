//! # Pipeline Module
//!
//! Request dispatch on top of the [`ring`](crate::ring).
//!
//! ## Stages
//!
//! 1. **routing** - resolve the endpoint and path variables
//! 2. **deserialization** - decode the body with the endpoint's strategy
//! 3. **invocation** - run the endpoint, in a transaction if it asks for one
//! 4. **serialization** (work pool) - encode the result, set headers and
//!    write the response
//!
//! A stage that fails records a [`DispatchError`](crate::error::DispatchError)
//! in the slot. Later stages skip the slot and serialization answers with the
//! error's status and a JSON body `{"error": kind, "message": detail}`.
//!
//! ## Ordering
//!
//! Responses for one [`OutputChannel`] are written in publish order even
//! though several serialization workers run at once. Across channels there is
//! no ordering.
//!
//! ## Example
//!
//! ```
//! use http::Method;
//! use smack::endpoint::{FnEndpoint, NoTransactions};
//! use smack::pipeline::{IncomingRequest, OutputChannel, Pipeline, Response, ResponseWriter};
//! use smack::router::RoutingDefinition;
//! use smack::runtime_config::PipelineConfig;
//! use smack::ring::WaitStrategy;
//! use std::sync::Arc;
//!
//! struct Stdout;
//! impl ResponseWriter for Stdout {
//!     fn write_response(&self, connection: u64, response: &Response<'_>) -> std::io::Result<()> {
//!         println!("{connection}: {}", response.status);
//!         Ok(())
//!     }
//! }
//!
//! let mut routes = RoutingDefinition::new();
//! routes.add_route("/ping", Arc::new(FnEndpoint::new(Method::GET, |_, _| Ok(()))));
//! let router = routes.compile_routes().unwrap();
//!
//! let config = PipelineConfig::new(64, WaitStrategy::Yielding, 2);
//! let mut pipeline = Pipeline::start(router, config, Arc::new(NoTransactions)).unwrap();
//!
//! let channel = OutputChannel::new(1, Arc::new(Stdout));
//! pipeline.publish(IncomingRequest::new(&Method::GET, "/ping", b"", &channel));
//! pipeline.shutdown();
//! ```

mod core;
mod event;
mod output;
mod stages;
mod stats;

pub use core::{Pipeline, RING_NAME};
pub use event::{IncomingRequest, RequestEvent};
pub use output::{OutputChannel, Response, ResponseWriter};
pub use stats::PipelineStats;
