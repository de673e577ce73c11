//! # Router Module
//!
//! Resolves `(verb, path)` to a registered [`Endpoint`] and binds path
//! variables, after a one-time compilation step.
//!
//! ## Overview
//!
//! Routing is split in two phases:
//!
//! 1. **Registration**: [`RoutingDefinition`] is an append-only list of
//!    `(pattern, endpoint)` entries. Collections nest by prefix
//!    ([`RoutingDefinition::add_routes`]) and resource types register
//!    themselves explicitly through [`RouteProvider`].
//!
//! 2. **Compilation**: [`RoutingDefinition::compile_routes`] builds an
//!    immutable [`Router`] (a segment tree). The router is `Send + Sync`,
//!    cheap to clone, and never mutated again, so any number of threads may
//!    match against it concurrently.
//!
//! ## Patterns
//!
//! A pattern is a `/`-separated list of segments. A segment is either a
//! literal, matched exactly, or a `{name}` placeholder that binds the
//! corresponding request segment into [`PathVariables`]. At any depth,
//! literals are tried before placeholders.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use smack::endpoint::FnEndpoint;
//! use smack::router::RoutingDefinition;
//! use std::sync::Arc;
//!
//! let mut routes = RoutingDefinition::new();
//! routes.add_route("/db/data/node/{id}", Arc::new(FnEndpoint::new(Method::GET, |_, _| Ok(()))));
//! let router = routes.compile_routes().expect("routes compile");
//!
//! let found = router.route(&Method::GET, "/db/data/node/7").expect("route matches");
//! assert_eq!(found.path_variables.get("id"), Some("7"));
//! assert!(router.route(&Method::POST, "/db/data/node/7").is_err());
//! ```
//!
//! ## Failure
//!
//! A path that matches nothing and a path that matches but has no endpoint
//! for the verb both fail with [`RouteError::ResourceNotFound`].
//!
//! [`Endpoint`]: crate::endpoint::Endpoint
//! [`RouteError::ResourceNotFound`]: crate::error::RouteError::ResourceNotFound

mod core;
mod definition;
mod radix;

pub use core::{PathVariables, RouteMatch, Router, MAX_INLINE_PARAMS};
pub use definition::{join_path, RouteEntry, RouteProvider, RoutingDefinition};
