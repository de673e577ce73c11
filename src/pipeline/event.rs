use super::output::OutputChannel;
use crate::endpoint::{Endpoint, InvocationResponse};
use crate::error::DispatchError;
use crate::router::PathVariables;
use http::{HeaderMap, Method};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// A decoded request handed over by the transport.
///
/// Borrowed so the producer copies straight into the slot's retained
/// buffers.
#[derive(Debug, Clone, Copy)]
pub struct IncomingRequest<'a> {
    pub verb: &'a Method,
    pub path: &'a str,
    /// Keep-alive; `false` adds `Connection: close` to the response
    pub persistent: bool,
    pub body: &'a [u8],
    pub channel: &'a OutputChannel,
}

impl<'a> IncomingRequest<'a> {
    #[must_use]
    pub fn new(verb: &'a Method, path: &'a str, body: &'a [u8], channel: &'a OutputChannel) -> Self {
        Self {
            verb,
            path,
            persistent: true,
            body,
            channel,
        }
    }

    #[must_use]
    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }
}

/// One reusable ring slot.
///
/// Every stage reads and writes the fields it owns; the ring's barriers make
/// sure only one stage touches the slot at a time. `reset` clears values but
/// keeps buffer capacity, so a warmed-up ring stops allocating.
pub struct RequestEvent {
    pub(crate) verb: Method,
    pub(crate) path: String,
    pub(crate) content: Vec<u8>,
    pub(crate) persistent: bool,
    pub(crate) channel: Option<OutputChannel>,
    pub(crate) ordinal: u64,
    pub(crate) path_variables: PathVariables,
    pub(crate) endpoint: Option<Arc<dyn Endpoint>>,
    pub(crate) deserialized: Value,
    pub(crate) response: InvocationResponse,
    pub(crate) body: Vec<u8>,
    pub(crate) headers: HeaderMap,
    pub(crate) failure: Option<DispatchError>,
}

impl Default for RequestEvent {
    fn default() -> Self {
        Self {
            verb: Method::GET,
            path: String::new(),
            content: Vec::new(),
            persistent: true,
            channel: None,
            ordinal: 0,
            path_variables: PathVariables::new(),
            endpoint: None,
            deserialized: Value::Null,
            response: InvocationResponse::default(),
            body: Vec::new(),
            headers: HeaderMap::new(),
            failure: None,
        }
    }
}

impl RequestEvent {
    /// Clear every field left by the previous occupant.
    pub fn reset(&mut self) {
        self.verb = Method::GET;
        self.path.clear();
        self.content.clear();
        self.persistent = true;
        self.channel = None;
        self.ordinal = 0;
        self.path_variables.clear();
        self.endpoint = None;
        self.deserialized = Value::Null;
        self.response.reset();
        self.body.clear();
        self.headers.clear();
        self.failure = None;
    }

    /// Reset and copy `request` in; stamps the channel's next ordinal.
    pub(crate) fn load(&mut self, request: &IncomingRequest<'_>) {
        self.reset();
        self.verb.clone_from(request.verb);
        self.path.push_str(request.path);
        self.content.extend_from_slice(request.body);
        self.persistent = request.persistent;
        self.ordinal = request.channel.assign_ordinal();
        self.channel = Some(request.channel.clone());
    }

    /// Record the first failure; later stages skip a failed slot.
    pub(crate) fn fail(&mut self, error: DispatchError) {
        if self.failure.is_none() {
            self.failure = Some(error);
        }
    }

    #[must_use]
    pub fn verb(&self) -> &Method {
        &self.verb
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn path_variables(&self) -> &PathVariables {
        &self.path_variables
    }

    #[must_use]
    pub fn failure(&self) -> Option<&DispatchError> {
        self.failure.as_ref()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

impl fmt::Debug for RequestEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestEvent")
            .field("verb", &self.verb)
            .field("path", &self.path)
            .field("ordinal", &self.ordinal)
            .field("path_variables", &self.path_variables)
            .field("routed", &self.endpoint.is_some())
            .field("failure", &self.failure)
            .finish_non_exhaustive()
    }
}
