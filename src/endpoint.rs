//! # Endpoint Contract
//!
//! An [`Endpoint`] is a handler bound to one verb and one path pattern. It
//! reports the strategies used to decode its request body and encode its
//! result, whether it must run inside a transaction, and the invocation logic
//! itself.
//!
//! Endpoints are created once at registration time and shared between stage
//! threads as `Arc<dyn Endpoint>`; they are never mutated afterwards.
//!
//! ## Example
//!
//! ```rust
//! use http::Method;
//! use serde_json::json;
//! use smack::endpoint::FnEndpoint;
//! use smack::strategy::JsonSerialization;
//!
//! let ping = FnEndpoint::new(Method::GET, |_inv, out| {
//!     out.ok(json!({"pong": true}));
//!     Ok(())
//! })
//! .with_serialization(JsonSerialization);
//! # let _ = ping;
//! ```

use crate::error::{InvocationError, TransactionError};
use crate::router::PathVariables;
use crate::strategy::{
    DeserializationStrategy, SerializationStrategy, NO_OP_DESERIALIZATION, NO_OP_SERIALIZATION,
};
use http::{Method, StatusCode};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Read-only view of the request handed to [`Endpoint::invoke`].
#[derive(Debug, Clone, Copy)]
pub struct Invocation<'a> {
    verb: &'a Method,
    path: &'a str,
    path_variables: &'a PathVariables,
    content: &'a Value,
}

impl<'a> Invocation<'a> {
    pub fn new(
        verb: &'a Method,
        path: &'a str,
        path_variables: &'a PathVariables,
        content: &'a Value,
    ) -> Self {
        Self {
            verb,
            path,
            path_variables,
            content,
        }
    }

    #[must_use]
    pub fn verb(&self) -> &Method {
        self.verb
    }

    #[must_use]
    pub fn path(&self) -> &str {
        self.path
    }

    #[must_use]
    pub fn path_variables(&self) -> &PathVariables {
        self.path_variables
    }

    /// Look up a bound path variable by name.
    #[must_use]
    pub fn path_variable(&self, name: &str) -> Option<&str> {
        self.path_variables.get(name)
    }

    /// Request body as decoded by the endpoint's deserialization strategy.
    #[must_use]
    pub fn content(&self) -> &Value {
        self.content
    }
}

/// Result an endpoint writes during invocation.
///
/// Lives inside the pipeline slot and is reset between requests.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationResponse {
    status: StatusCode,
    location: Option<String>,
    value: Value,
}

impl Default for InvocationResponse {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            location: None,
            value: Value::Null,
        }
    }
}

impl InvocationResponse {
    /// 200 with `value` as the result.
    pub fn ok(&mut self, value: Value) {
        self.status = StatusCode::OK;
        self.value = value;
    }

    /// 201 with a `Location` header.
    pub fn created(&mut self, location: impl Into<String>, value: Value) {
        self.status = StatusCode::CREATED;
        self.location = Some(location.into());
        self.value = value;
    }

    /// 204 with no result.
    pub fn no_content(&mut self) {
        self.status = StatusCode::NO_CONTENT;
        self.value = Value::Null;
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn set_value(&mut self, value: Value) {
        self.value = value;
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Back to a fresh 200/null response.
    pub fn reset(&mut self) {
        self.status = StatusCode::OK;
        self.location = None;
        self.value = Value::Null;
    }
}

/// Handler bound to one verb and one path pattern.
pub trait Endpoint: Send + Sync {
    fn verb(&self) -> Method;

    fn deserialization_strategy(&self) -> &dyn DeserializationStrategy {
        &NO_OP_DESERIALIZATION
    }

    fn serialization_strategy(&self) -> &dyn SerializationStrategy {
        &NO_OP_SERIALIZATION
    }

    /// Whether invocation must be wrapped in a transaction scope.
    fn is_transactional(&self) -> bool {
        false
    }

    /// Run the business logic and write the result into `output`.
    ///
    /// # Errors
    ///
    /// Any [`InvocationError`] rolls back a transactional endpoint and is
    /// turned into an error response by the serialization stage.
    fn invoke(
        &self,
        invocation: &Invocation<'_>,
        output: &mut InvocationResponse,
    ) -> Result<(), InvocationError>;
}

/// Transaction collaborator for transactional endpoints.
///
/// Called only from the invocation stage thread, with at most one scope open
/// at a time, so implementations may keep the open transaction thread-local.
pub trait TransactionManager: Send + Sync {
    /// # Errors
    ///
    /// A failure to begin fails the request without invoking the endpoint.
    fn begin(&self) -> Result<(), TransactionError>;

    /// # Errors
    ///
    /// A failed commit fails the request.
    fn commit(&self) -> Result<(), TransactionError>;

    fn rollback(&self);
}

/// Transaction manager for deployments without a transactional store.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransactions;

impl TransactionManager for NoTransactions {
    fn begin(&self) -> Result<(), TransactionError> {
        Ok(())
    }

    fn commit(&self) -> Result<(), TransactionError> {
        Ok(())
    }

    fn rollback(&self) {}
}

/// Endpoint built from a closure.
pub struct FnEndpoint<F> {
    verb: Method,
    deserialization: Arc<dyn DeserializationStrategy>,
    serialization: Arc<dyn SerializationStrategy>,
    transactional: bool,
    handler: F,
}

impl<F> FnEndpoint<F>
where
    F: Fn(&Invocation<'_>, &mut InvocationResponse) -> Result<(), InvocationError> + Send + Sync,
{
    /// New endpoint with no-op strategies that is not transactional.
    pub fn new(verb: Method, handler: F) -> Self {
        Self {
            verb,
            deserialization: Arc::new(NO_OP_DESERIALIZATION),
            serialization: Arc::new(NO_OP_SERIALIZATION),
            transactional: false,
            handler,
        }
    }

    #[must_use]
    pub fn with_deserialization<D>(mut self, strategy: D) -> Self
    where
        D: DeserializationStrategy + 'static,
    {
        self.deserialization = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn with_serialization<S>(mut self, strategy: S) -> Self
    where
        S: SerializationStrategy + 'static,
    {
        self.serialization = Arc::new(strategy);
        self
    }

    #[must_use]
    pub fn transactional(mut self, transactional: bool) -> Self {
        self.transactional = transactional;
        self
    }
}

impl<F> Endpoint for FnEndpoint<F>
where
    F: Fn(&Invocation<'_>, &mut InvocationResponse) -> Result<(), InvocationError> + Send + Sync,
{
    fn verb(&self) -> Method {
        self.verb.clone()
    }

    fn deserialization_strategy(&self) -> &dyn DeserializationStrategy {
        &*self.deserialization
    }

    fn serialization_strategy(&self) -> &dyn SerializationStrategy {
        &*self.serialization
    }

    fn is_transactional(&self) -> bool {
        self.transactional
    }

    fn invoke(
        &self,
        invocation: &Invocation<'_>,
        output: &mut InvocationResponse,
    ) -> Result<(), InvocationError> {
        (self.handler)(invocation, output)
    }
}

impl<F> fmt::Debug for FnEndpoint<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnEndpoint")
            .field("verb", &self.verb)
            .field("transactional", &self.transactional)
            .finish_non_exhaustive()
    }
}
