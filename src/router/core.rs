//! Router core module - hot path for request routing.
//!
//! The following clippy lints are denied here to keep allocation out of the
//! matching path:
//!
//! - `clippy::inefficient_to_string`
//! - `clippy::format_push_string`
//! - `clippy::unnecessary_to_owned`

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use super::definition::RouteEntry;
use super::radix::{normalize, parse_pattern, shape_key, split_path, RadixNode};
use crate::endpoint::Endpoint;
use crate::error::RouteError;
use http::Method;
use smallvec::SmallVec;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::ops::Range;
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Maximum number of path variables before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Variables bound by a successful match, in pattern order.
///
/// Names are `Arc<str>` shared with the compiled tree, so binding a variable
/// clones a pointer rather than the name. Values are appended to one string
/// buffer that is cleared, not freed, between requests; a slot that keeps its
/// `PathVariables` stops allocating once the buffer has grown to the longest
/// path it has seen. Up to [`MAX_INLINE_PARAMS`] bindings are stored inline.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct PathVariables {
    bindings: SmallVec<[(Arc<str>, Range<usize>); MAX_INLINE_PARAMS]>,
    values: String,
}

impl PathVariables {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a variable by name.
    ///
    /// Uses "last write wins" semantics: if a pattern repeats a name at
    /// different depths (e.g. `/org/{id}/user/{id}`), the deepest binding is
    /// returned.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.bindings
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, range)| &self.values[range.clone()])
    }

    pub fn push(&mut self, name: Arc<str>, value: &str) {
        let start = self.values.len();
        self.values.push_str(value);
        self.bindings.push((name, start..self.values.len()));
    }

    /// Drop every binding after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        if let Some((_, range)) = self.bindings.get(len) {
            self.values.truncate(range.start);
            self.bindings.truncate(len);
        }
    }

    /// Remove all bindings, keeping the value buffer's capacity.
    pub fn clear(&mut self) {
        self.bindings.clear();
        self.values.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.bindings
            .iter()
            .map(|(k, range)| (k.as_ref(), &self.values[range.clone()]))
    }

    /// Bytes reserved for values; grows with the longest set of bindings.
    #[must_use]
    pub fn value_capacity(&self) -> usize {
        self.values.capacity()
    }
}

impl fmt::Debug for PathVariables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Result of successfully resolving a request.
#[derive(Clone)]
pub struct RouteMatch {
    /// The endpoint registered for the verb and pattern
    pub endpoint: Arc<dyn Endpoint>,
    /// Variables bound from `{name}` segments
    pub path_variables: PathVariables,
}

impl fmt::Debug for RouteMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteMatch")
            .field("verb", &self.endpoint.verb())
            .field("path_variables", &self.path_variables)
            .finish()
    }
}

/// Compiled, immutable route table.
///
/// Built by [`RoutingDefinition::compile_routes`]. Clones share the same tree.
///
/// [`RoutingDefinition::compile_routes`]: super::RoutingDefinition::compile_routes
#[derive(Clone)]
pub struct Router {
    root: Arc<RadixNode>,
    routes: Arc<[(Method, String)]>,
}

impl Router {
    pub(crate) fn compile(entries: &[RouteEntry]) -> Result<Self, RouteError> {
        let mut root = RadixNode::root();
        let mut routes = Vec::with_capacity(entries.len());
        let mut shapes = HashSet::with_capacity(entries.len());

        for entry in entries {
            let segments = parse_pattern(entry.path())?;
            let pattern = normalize(&segments);
            // `/a/{id}` and `/a/{name}` match the same requests
            if !shapes.insert((entry.endpoint().verb(), shape_key(&segments))) {
                return Err(RouteError::DuplicateRoute {
                    verb: entry.endpoint().verb(),
                    pattern,
                });
            }
            root.insert(&segments, Arc::clone(entry.endpoint()));
            debug!(
                verb = %entry.endpoint().verb(),
                pattern = %pattern,
                "Route compiled"
            );
            routes.push((entry.endpoint().verb(), pattern));
        }

        info!(routes_count = routes.len(), "Routing table compiled");

        Ok(Self {
            root: Arc::new(root),
            routes: routes.into(),
        })
    }

    /// Resolve `verb` and `path` to an endpoint and its bound variables.
    ///
    /// # Errors
    ///
    /// [`RouteError::ResourceNotFound`] when no pattern matches the path, and
    /// equally when a pattern matches the path but not the verb.
    pub fn route(&self, verb: &Method, path: &str) -> Result<RouteMatch, RouteError> {
        let mut path_variables = PathVariables::new();
        let endpoint = self.route_into(verb, path, &mut path_variables)?;
        Ok(RouteMatch {
            endpoint,
            path_variables,
        })
    }

    /// Like [`Router::route`], but binds variables into caller-owned storage.
    ///
    /// `vars` is cleared first. The pipeline passes the slot's own
    /// [`PathVariables`] so matching reuses its inline storage.
    ///
    /// # Errors
    ///
    /// [`RouteError::ResourceNotFound`] as for [`Router::route`].
    pub fn route_into(
        &self,
        verb: &Method,
        path: &str,
        vars: &mut PathVariables,
    ) -> Result<Arc<dyn Endpoint>, RouteError> {
        vars.clear();
        let segments = split_path(path);
        match self.root.search(&segments, verb, vars) {
            Some(endpoint) => {
                trace!(verb = %verb, path = %path, vars = vars.len(), "Route matched");
                Ok(Arc::clone(endpoint))
            }
            None => {
                debug!(verb = %verb, path = %path, "No route matched");
                Err(RouteError::ResourceNotFound {
                    verb: verb.clone(),
                    path: path.to_owned(),
                })
            }
        }
    }

    /// Every compiled `(verb, normalized pattern)`, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str)> {
        self.routes.iter().map(|(m, p)| (m, p.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Print all compiled routes to stdout.
    ///
    /// # Errors
    ///
    /// Propagates stdout write failures.
    pub fn dump_routes(&self) -> io::Result<()> {
        self.write_routes(&mut io::stdout().lock())
    }

    /// Write one `[route] VERB pattern` line per compiled route, in
    /// registration order, after a `[routes] count=N` header.
    ///
    /// # Errors
    ///
    /// Propagates failures from `out`.
    pub fn write_routes(&self, out: &mut impl io::Write) -> io::Result<()> {
        writeln!(out, "[routes] count={}", self.routes.len())?;
        for (verb, pattern) in self.routes.iter() {
            writeln!(out, "[route] {verb} {pattern}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routes", &self.routes)
            .finish_non_exhaustive()
    }
}
