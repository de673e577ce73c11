use super::core::Router;
use crate::endpoint::Endpoint;
use crate::error::RouteError;
use std::fmt;
use std::sync::Arc;

/// One registered `(pattern, endpoint)` pair.
#[derive(Clone)]
pub struct RouteEntry {
    path: String,
    endpoint: Arc<dyn Endpoint>,
}

impl RouteEntry {
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    #[must_use]
    pub fn endpoint(&self) -> &Arc<dyn Endpoint> {
        &self.endpoint
    }
}

impl fmt::Debug for RouteEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteEntry")
            .field("verb", &self.endpoint.verb())
            .field("path", &self.path)
            .finish()
    }
}

/// A resource that registers its own endpoints.
///
/// The provider fills a fresh definition with paths relative to wherever it
/// is mounted; [`RoutingDefinition::add_provider`] then prefixes them.
pub trait RouteProvider {
    fn define_routes(&self, routes: &mut RoutingDefinition);
}

/// Append-only list of route entries, compiled into a [`Router`].
#[derive(Clone, Default)]
pub struct RoutingDefinition {
    entries: Vec<RouteEntry>,
}

impl RoutingDefinition {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `endpoint` at `pattern`.
    pub fn add_route(&mut self, pattern: &str, endpoint: Arc<dyn Endpoint>) -> &mut Self {
        self.entries.push(RouteEntry {
            path: pattern.to_string(),
            endpoint,
        });
        self
    }

    /// Flatten `nested` into this definition, prefixing every nested pattern
    /// with `prefix`.
    pub fn add_routes(&mut self, prefix: &str, nested: &RoutingDefinition) -> &mut Self {
        for entry in &nested.entries {
            self.entries.push(RouteEntry {
                path: join_path(prefix, &entry.path),
                endpoint: Arc::clone(&entry.endpoint),
            });
        }
        self
    }

    /// Let `provider` declare its endpoints, mounted under `prefix`.
    pub fn add_provider(&mut self, prefix: &str, provider: &dyn RouteProvider) -> &mut Self {
        let mut nested = RoutingDefinition::new();
        provider.define_routes(&mut nested);
        self.add_routes(prefix, &nested)
    }

    #[must_use]
    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Build the immutable lookup structure from every entry registered so
    /// far.
    ///
    /// # Errors
    ///
    /// [`RouteError::DuplicateRoute`] when two entries share a verb and
    /// pattern, [`RouteError::InvalidPattern`] for malformed placeholders.
    pub fn compile_routes(&self) -> Result<Router, RouteError> {
        Router::compile(&self.entries)
    }
}

impl fmt::Debug for RoutingDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.entries).finish()
    }
}

/// Concatenate a mount prefix and a pattern with exactly one `/` between
/// them.
#[must_use]
pub fn join_path(prefix: &str, path: &str) -> String {
    let head = prefix.trim_end_matches('/');
    let tail = path.trim_start_matches('/');
    if head.is_empty() {
        return path.to_string();
    }
    if tail.is_empty() {
        return head.to_string();
    }
    format!("{head}/{tail}")
}
