//! # Error Taxonomy
//!
//! Every failure a request can hit on its way through the pipeline is one of
//! the kinds below. Stages never abort their thread on a failure; they record
//! a [`DispatchError`] in the slot and the serialization stage turns it into a
//! terminal error response using [`DispatchError::status`].
//!
//! | Kind | Raised by | Response |
//! |------|-----------|----------|
//! | `ResourceNotFound` | router (miss or verb mismatch) | 404 |
//! | `Deserialization` | deserialization strategy | 400 |
//! | `Serialization` | serialization strategy | 500 |
//! | `Invocation` | endpoint logic (or a panic inside it) | error status, 500 by default |
//! | `Transaction` | transaction manager | 500 |
//! | `Internal` | a stage handler or manager that panicked | 500 |
//!
//! Backpressure is not an error: the producer simply waits.

use http::{Method, StatusCode};
use std::fmt;

/// Failure raised while compiling or matching routes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// No compiled route matches the verb and path.
    ///
    /// Raised both when no pattern matches the path at all and when a pattern
    /// matches but has no endpoint for the verb. Callers cannot tell the two
    /// apart.
    ResourceNotFound {
        /// Requested verb
        verb: Method,
        /// Requested path
        path: String,
    },
    /// Two entries were registered for the same verb and pattern.
    DuplicateRoute {
        /// Verb registered twice
        verb: Method,
        /// Normalized pattern registered twice
        pattern: String,
    },
    /// A pattern contains a malformed placeholder segment.
    InvalidPattern {
        /// The offending pattern
        pattern: String,
        /// What is wrong with it
        reason: &'static str,
    },
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteError::ResourceNotFound { verb, path } => {
                write!(f, "resource not found: {verb} {path}")
            }
            RouteError::DuplicateRoute { verb, pattern } => {
                write!(f, "duplicate route: {verb} {pattern} is registered more than once")
            }
            RouteError::InvalidPattern { pattern, reason } => {
                write!(f, "invalid route pattern '{pattern}': {reason}")
            }
        }
    }
}

impl std::error::Error for RouteError {}

/// A serialization strategy could not encode a value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerializationError {
    message: String,
}

impl SerializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SerializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "serialization failed: {}", self.message)
    }
}

impl std::error::Error for SerializationError {}

impl From<serde_json::Error> for SerializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<std::io::Error> for SerializationError {
    fn from(err: std::io::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// A deserialization strategy rejected the request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeserializationError {
    message: String,
}

impl DeserializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for DeserializationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed request body: {}", self.message)
    }
}

impl std::error::Error for DeserializationError {}

impl From<serde_json::Error> for DeserializationError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Business logic inside an endpoint failed.
///
/// Carries the status the client should see; [`InvocationError::new`] uses
/// 500, [`InvocationError::with_status`] lets an endpoint pick a 4xx.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationError {
    status: StatusCode,
    message: String,
}

impl InvocationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn with_status(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for InvocationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invocation failed ({}): {}", self.status, self.message)
    }
}

impl std::error::Error for InvocationError {}

/// The transaction manager could not begin or commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionError {
    message: String,
}

impl TransactionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransactionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transaction failed: {}", self.message)
    }
}

impl std::error::Error for TransactionError {}

/// Terminal failure recorded in a pipeline slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// No endpoint for the verb and path
    ResourceNotFound {
        /// Requested verb
        verb: Method,
        /// Requested path
        path: String,
    },
    /// Request body could not be decoded
    Deserialization(DeserializationError),
    /// Result could not be encoded
    Serialization(SerializationError),
    /// Endpoint logic failed
    Invocation(InvocationError),
    /// Transaction scope could not be opened or committed
    Transaction(TransactionError),
    /// A stage failed for a reason the request is not responsible for
    Internal(String),
}

impl DispatchError {
    /// Status code of the error response sent to the client.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::ResourceNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::Deserialization(_) => StatusCode::BAD_REQUEST,
            DispatchError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DispatchError::Invocation(err) => err.status(),
            DispatchError::Transaction(_) | DispatchError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Short machine-readable kind, used as the `error` field of the body.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::ResourceNotFound { .. } => "resource_not_found",
            DispatchError::Deserialization(_) => "deserialization_failure",
            DispatchError::Serialization(_) => "serialization_failure",
            DispatchError::Invocation(_) => "invocation_failure",
            DispatchError::Transaction(_) => "transaction_failure",
            DispatchError::Internal(_) => "internal_error",
        }
    }
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::ResourceNotFound { verb, path } => {
                write!(f, "resource not found: {verb} {path}")
            }
            DispatchError::Deserialization(err) => err.fmt(f),
            DispatchError::Serialization(err) => err.fmt(f),
            DispatchError::Invocation(err) => err.fmt(f),
            DispatchError::Transaction(err) => err.fmt(f),
            DispatchError::Internal(message) => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for DispatchError {}

impl From<RouteError> for DispatchError {
    fn from(err: RouteError) -> Self {
        match err {
            RouteError::ResourceNotFound { verb, path } => {
                DispatchError::ResourceNotFound { verb, path }
            }
            err @ (RouteError::DuplicateRoute { .. } | RouteError::InvalidPattern { .. }) => {
                DispatchError::Internal(err.to_string())
            }
        }
    }
}

impl From<DeserializationError> for DispatchError {
    fn from(err: DeserializationError) -> Self {
        DispatchError::Deserialization(err)
    }
}

impl From<SerializationError> for DispatchError {
    fn from(err: SerializationError) -> Self {
        DispatchError::Serialization(err)
    }
}

impl From<InvocationError> for DispatchError {
    fn from(err: InvocationError) -> Self {
        DispatchError::Invocation(err)
    }
}

impl From<TransactionError> for DispatchError {
    fn from(err: TransactionError) -> Self {
        DispatchError::Transaction(err)
    }
}

/// Failure to configure, start or feed the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Ring capacity must be a non-zero power of two
    InvalidRingSize(usize),
    /// A work-pool stage needs at least one worker
    InvalidWorkerCount(usize),
    /// `try_publish` found no free slot
    RingFull,
    /// A stage thread could not be spawned
    ThreadSpawn(String),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::InvalidRingSize(size) => {
                write!(f, "ring size {size} is not a non-zero power of two")
            }
            PipelineError::InvalidWorkerCount(count) => {
                write!(f, "work pool needs at least one worker, got {count}")
            }
            PipelineError::RingFull => write!(f, "ring buffer is full"),
            PipelineError::ThreadSpawn(reason) => {
                write!(f, "failed to spawn stage thread: {reason}")
            }
        }
    }
}

impl std::error::Error for PipelineError {}
