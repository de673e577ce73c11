//! Stage handlers wired into the ring by [`Pipeline::start`].
//!
//! [`Pipeline::start`]: super::Pipeline::start

use super::event::RequestEvent;
use super::output::Response;
use super::stats::PipelineCounters;
use crate::endpoint::{Endpoint, Invocation, InvocationResponse, TransactionManager};
use crate::error::{
    DeserializationError, DispatchError, InvocationError, SerializationError, TransactionError,
};
use crate::ring::{panic_message, EventHandler, WorkHandler};
use crate::router::Router;
use crate::strategy::{SerializationStrategy, Serializer, NO_OP_SERIALIZATION};
use http::header::{CONNECTION, CONTENT_LENGTH, CONTENT_TYPE, LOCATION, TRANSFER_ENCODING};
use http::{HeaderValue, StatusCode};
use serde_json::json;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Resolves the endpoint and binds path variables into the slot.
pub(crate) struct RoutingHandler {
    router: Router,
}

impl RoutingHandler {
    pub(crate) fn new(router: Router) -> Self {
        Self { router }
    }
}

impl EventHandler<RequestEvent> for RoutingHandler {
    fn on_event(&mut self, event: &mut RequestEvent, _sequence: i64, _end_of_batch: bool) {
        let router = &self.router;
        match guarded(|| router.route_into(&event.verb, &event.path, &mut event.path_variables)) {
            Ok(Ok(endpoint)) => event.endpoint = Some(endpoint),
            Ok(Err(err)) => event.fail(err.into()),
            Err(message) => {
                error!(path = %event.path, panic_message = %message, "Router panicked");
                event.path_variables.clear();
                event.fail(DispatchError::Internal(format!("router panicked: {message}")));
            }
        }
    }
}

/// Decodes the raw body with the routed endpoint's strategy.
pub(crate) struct DeserializationHandler;

impl EventHandler<RequestEvent> for DeserializationHandler {
    fn on_event(&mut self, event: &mut RequestEvent, sequence: i64, _end_of_batch: bool) {
        if event.is_failed() {
            return;
        }
        let Some(endpoint) = &event.endpoint else {
            return;
        };
        let content = &event.content;
        let decoded = guarded(|| endpoint.deserialization_strategy().deserialize(content))
            .unwrap_or_else(|message| {
                error!(sequence, panic_message = %message, "Deserializer panicked");
                Err(DeserializationError::new(format!(
                    "deserializer panicked: {message}"
                )))
            });
        match decoded {
            Ok(value) => event.deserialized = value,
            Err(err) => {
                debug!(sequence, path = %event.path, error = %err, "Request body rejected");
                event.fail(err.into());
            }
        }
    }
}

/// Runs the endpoint, inside a transaction when it asks for one.
///
/// Panics from the endpoint or the transaction manager are caught here and
/// fail only the request that raised them.
pub(crate) struct InvocationHandler {
    transactions: Arc<dyn TransactionManager>,
}

impl InvocationHandler {
    pub(crate) fn new(transactions: Arc<dyn TransactionManager>) -> Self {
        Self { transactions }
    }

    fn invoke(
        &self,
        endpoint: &dyn Endpoint,
        invocation: &Invocation<'_>,
        response: &mut InvocationResponse,
    ) -> Result<(), DispatchError> {
        let transactional = guarded(|| endpoint.is_transactional()).map_err(|message| {
            error!(path = %invocation.path(), panic_message = %message, "Endpoint panicked");
            InvocationError::new(format!("endpoint panicked: {message}"))
        })?;
        if transactional {
            match guarded(|| self.transactions.begin()) {
                Ok(begun) => begun?,
                Err(message) => {
                    error!(panic_message = %message, "Transaction begin panicked");
                    self.rollback();
                    return Err(TransactionError::new(format!("begin panicked: {message}")).into());
                }
            }
        }

        let result = match guarded(|| endpoint.invoke(invocation, response)) {
            Ok(outcome) => outcome.map_err(DispatchError::from),
            Err(message) => {
                error!(
                    verb = %invocation.verb(),
                    path = %invocation.path(),
                    panic_message = %message,
                    "Endpoint panicked"
                );
                Err(InvocationError::new(format!("endpoint panicked: {message}")).into())
            }
        };

        if transactional {
            if result.is_err() {
                self.rollback();
                return result;
            }
            let committed = guarded(|| self.transactions.commit()).unwrap_or_else(|message| {
                error!(panic_message = %message, "Transaction commit panicked");
                Err(TransactionError::new(format!("commit panicked: {message}")))
            });
            if let Err(err) = committed {
                self.rollback();
                return Err(err.into());
            }
        }
        result
    }

    fn rollback(&self) {
        if let Err(message) = guarded(|| self.transactions.rollback()) {
            error!(panic_message = %message, "Transaction rollback panicked");
        }
    }
}

impl EventHandler<RequestEvent> for InvocationHandler {
    fn on_event(&mut self, event: &mut RequestEvent, sequence: i64, _end_of_batch: bool) {
        if event.is_failed() {
            return;
        }
        let RequestEvent {
            verb,
            path,
            path_variables,
            endpoint,
            deserialized,
            response,
            failure,
            ..
        } = event;
        let Some(endpoint) = endpoint.as_deref() else {
            return;
        };

        let invocation = Invocation::new(verb, path, path_variables, deserialized);
        if let Err(err) = self.invoke(endpoint, &invocation, response) {
            debug!(sequence, path = %path, error = %err, "Invocation failed");
            *failure = Some(err);
        }
    }
}

/// Encodes the result and writes it to the connection, in arrival order.
///
/// Encoding happens before waiting for the connection's turn, so workers
/// serialize in parallel and only the write itself is ordered.
pub(crate) struct SerializationHandler {
    counters: Arc<PipelineCounters>,
}

impl SerializationHandler {
    pub(crate) fn new(counters: Arc<PipelineCounters>) -> Self {
        Self { counters }
    }
}

impl WorkHandler<RequestEvent> for SerializationHandler {
    fn on_event(&mut self, event: &mut RequestEvent, sequence: i64) {
        let Some(channel) = event.channel.take() else {
            warn!(sequence, "Slot published without an output channel");
            return;
        };

        let rendered = guarded(|| render(event));
        let (status, chunked) = rendered.unwrap_or_else(|message| {
            error!(sequence, panic_message = %message, "Serializer panicked");
            event.fail(SerializationError::new(format!("serializer panicked: {message}")).into());
            render(event)
        });

        let turn = channel.take_turn(event.ordinal);
        let response = Response {
            status,
            headers: &event.headers,
            body: &event.body,
            chunked,
        };
        if let Err(err) = turn.write(&response) {
            self.counters.write_errors.fetch_add(1, Ordering::Relaxed);
            warn!(
                connection = channel.id(),
                sequence,
                error = %err,
                "Failed to write response"
            );
        }
        drop(turn);

        if event.is_failed() {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
        }
        self.counters.completed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Run `f`, turning a panic into its message.
fn guarded<R>(f: impl FnOnce() -> R) -> Result<R, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|panic| panic_message(panic.as_ref()).to_owned())
}

/// Fill the slot's body and headers; returns the status and framing.
fn render(event: &mut RequestEvent) -> (StatusCode, bool) {
    event.body.clear();
    event.headers.clear();

    if !event.is_failed() {
        let strategy: &dyn SerializationStrategy = event
            .endpoint
            .as_deref()
            .map_or(&NO_OP_SERIALIZATION as &dyn SerializationStrategy, |endpoint| {
                endpoint.serialization_strategy()
            });
        let value = event.response.value();
        event
            .body
            .reserve(strategy.estimated_serialized_size_in_bytes(value));
        let encoded = strategy.serialize(value, &mut Serializer::new(&mut event.body));

        match encoded {
            Ok(()) => {
                let status = event.response.status();
                let chunked = strategy.is_streaming();
                if let Some(media_type) = strategy.media_type() {
                    if !event.body.is_empty() {
                        insert_header(event, CONTENT_TYPE, media_type);
                    }
                }
                if status == StatusCode::CREATED {
                    if let Some(location) = event.response.location() {
                        let location = location.to_owned();
                        insert_header(event, LOCATION, &location);
                    }
                }
                finish_headers(event, chunked);
                return (status, chunked);
            }
            Err(err) => {
                event.body.clear();
                event.fail(err.into());
            }
        }
    }

    let (status, kind, message) = match &event.failure {
        Some(failure) => (failure.status(), failure.kind(), failure.to_string()),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", String::new()),
    };
    let error_body = json!({ "error": kind, "message": message });
    if serde_json::to_writer(&mut event.body, &error_body).is_err() {
        event.body.clear();
    }
    event
        .headers
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    finish_headers(event, false);
    (status, false)
}

fn finish_headers(event: &mut RequestEvent, chunked: bool) {
    if chunked {
        event
            .headers
            .insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
    } else {
        event
            .headers
            .insert(CONTENT_LENGTH, HeaderValue::from(event.body.len()));
    }
    if !event.persistent {
        event
            .headers
            .insert(CONNECTION, HeaderValue::from_static("close"));
    }
}

fn insert_header(event: &mut RequestEvent, name: http::HeaderName, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(value) => {
            event.headers.insert(name, value);
        }
        Err(_) => warn!(header = %name, value = %value, "Dropping invalid header value"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::FnEndpoint;
    use crate::error::RouteError;
    use crate::strategy::{JsonLinesSerialization, JsonSerialization};
    use http::Method;

    fn routed(endpoint: impl Endpoint + 'static) -> RequestEvent {
        let mut event = RequestEvent::default();
        event.endpoint = Some(Arc::new(endpoint));
        event
    }

    #[test]
    fn test_render_success_sets_length_and_type() {
        let mut event = routed(
            FnEndpoint::new(Method::GET, |_, _| Ok(())).with_serialization(JsonSerialization),
        );
        event.response.ok(json!({"name": "node"}));

        let (status, chunked) = render(&mut event);
        assert_eq!(status, StatusCode::OK);
        assert!(!chunked);
        assert_eq!(event.body, br#"{"name":"node"}"#);
        assert_eq!(event.headers[CONTENT_TYPE], "application/json");
        assert_eq!(event.headers[CONTENT_LENGTH], "15");
        assert!(event.headers.get(CONNECTION).is_none());
    }

    #[test]
    fn test_render_created_streaming_non_persistent() {
        let mut event = routed(
            FnEndpoint::new(Method::POST, |_, _| Ok(())).with_serialization(JsonLinesSerialization),
        );
        event.persistent = false;
        event.response.created("/db/data/node/1", json!([1, 2]));

        let (status, chunked) = render(&mut event);
        assert_eq!(status, StatusCode::CREATED);
        assert!(chunked);
        assert_eq!(event.headers[LOCATION], "/db/data/node/1");
        assert_eq!(event.headers[TRANSFER_ENCODING], "chunked");
        assert!(event.headers.get(CONTENT_LENGTH).is_none());
        assert_eq!(event.headers[CONNECTION], "close");
    }

    #[test]
    fn test_render_failure_as_json_error() {
        let mut event = RequestEvent::default();
        event.fail(
            RouteError::ResourceNotFound {
                verb: Method::GET,
                path: "/missing".into(),
            }
            .into(),
        );

        let (status, chunked) = render(&mut event);
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(!chunked);
        let body: serde_json::Value = serde_json::from_slice(&event.body).unwrap();
        assert_eq!(body["error"], "resource_not_found");
        assert!(body["message"].as_str().unwrap().contains("/missing"));
        assert_eq!(event.headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_location_ignored_unless_created() {
        let mut event = routed(FnEndpoint::new(Method::PUT, |_, _| Ok(())));
        event.response.created("/x", serde_json::Value::Null);
        event.response.set_status(StatusCode::OK);

        render(&mut event);
        assert!(event.headers.get(LOCATION).is_none());
        assert_eq!(event.headers[CONTENT_LENGTH], "0");
    }
}
