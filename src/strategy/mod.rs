//! # Strategy Module
//!
//! Pluggable converters between domain values and wire bytes.
//!
//! The pipeline never looks at body bytes itself. Each [`Endpoint`] reports a
//! [`DeserializationStrategy`] that turns the raw request body into a
//! [`serde_json::Value`], and a [`SerializationStrategy`] that turns the
//! endpoint's result back into bytes written to a [`Serializer`].
//!
//! ## Provided Strategies
//!
//! | Strategy | Direction | Streaming | Notes |
//! |----------|-----------|-----------|-------|
//! | [`NoOpSerialization`] | out | no | zero bytes, estimate 0 |
//! | [`NoOpDeserialization`] | in | - | ignores the body, yields `null` |
//! | [`JsonSerialization`] | out | no | compact JSON, `application/json` |
//! | [`JsonLinesSerialization`] | out | yes | one JSON document per line |
//! | [`JsonDeserialization`] | in | - | empty body yields `null` |
//! | [`TypedJsonDeserialization`] | in | - | validates against a serde type |
//!
//! Which variant an endpoint uses for a given request (content negotiation)
//! is decided outside the pipeline.
//!
//! [`Endpoint`]: crate::endpoint::Endpoint

mod core;
mod json;

pub use core::{
    DeserializationStrategy, NoOpDeserialization, NoOpSerialization, SerializationStrategy,
    Serializer, NO_OP_DESERIALIZATION, NO_OP_SERIALIZATION,
};
pub use json::{
    estimate_json_size, JsonDeserialization, JsonLinesSerialization, JsonSerialization,
    TypedJsonDeserialization,
};
