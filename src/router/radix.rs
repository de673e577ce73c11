//! Segment tree behind the compiled [`Router`](super::Router).
//!
//! Each node is one path segment. Literal children match exactly; parameter
//! children match any single segment and bind it. Endpoints hang off the node
//! where their pattern ends, keyed by verb.
//!
//! Lookup walks at most one node per request segment along the literal path
//! and only backtracks into parameter children when a literal branch dead-ends,
//! so cost tracks the path length, not the number of routes.

use super::core::PathVariables;
use crate::endpoint::Endpoint;
use crate::error::RouteError;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;

/// A parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// Split a pattern into segments, validating placeholders.
pub(crate) fn parse_pattern(pattern: &str) -> Result<Vec<Segment<'_>>, RouteError> {
    let without_query = pattern.split('?').next().unwrap_or("");
    let mut segments = Vec::new();
    for raw in without_query.split('/').filter(|s| !s.is_empty()) {
        if let Some(name) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if name.is_empty() {
                return Err(invalid(pattern, "empty placeholder"));
            }
            if name.contains(['{', '}']) {
                return Err(invalid(pattern, "nested braces in placeholder"));
            }
            segments.push(Segment::Variable(name));
        } else if raw.contains(['{', '}']) {
            return Err(invalid(pattern, "placeholder must span a whole segment"));
        } else {
            segments.push(Segment::Literal(raw));
        }
    }
    Ok(segments)
}

/// Canonical form of a parsed pattern, used in diagnostics.
pub(crate) fn normalize(segments: &[Segment<'_>]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Variable(name) => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
        }
    }
    out
}

/// Pattern with placeholder names erased, so two patterns that match the same
/// requests share a key.
pub(crate) fn shape_key(segments: &[Segment<'_>]) -> String {
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        match segment {
            Segment::Literal(s) => out.push_str(s),
            Segment::Variable(_) => out.push_str("{}"),
        }
    }
    out
}

fn invalid(pattern: &str, reason: &'static str) -> RouteError {
    RouteError::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    }
}

/// Request path segments, inline for typical depths.
pub(crate) type PathSegments<'a> = SmallVec<[&'a str; 16]>;

/// Split a request path into segments, dropping the query string and empty
/// segments.
pub(crate) fn split_path(path: &str) -> PathSegments<'_> {
    let without_query = path.split('?').next().unwrap_or("");
    without_query.split('/').filter(|s| !s.is_empty()).collect()
}

type VerbTable = SmallVec<[(Method, Arc<dyn Endpoint>); 4]>;

pub(crate) struct RadixNode {
    segment: Box<str>,
    param_name: Option<Arc<str>>,
    endpoints: VerbTable,
    children: Vec<RadixNode>,
    param_children: Vec<RadixNode>,
}

impl RadixNode {
    pub(crate) fn root() -> Self {
        Self::new(Box::from(""), None)
    }

    fn new(segment: Box<str>, param_name: Option<Arc<str>>) -> Self {
        Self {
            segment,
            param_name,
            endpoints: SmallVec::new(),
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    /// Insert `endpoint` at the node reached by `segments`.
    ///
    /// Parameter children are shared only when the placeholder name matches,
    /// so `/users/{user_id}/posts` and `/users/{id}/comments` each bind their
    /// own name. Callers reject duplicate `(verb, shape)` pairs beforehand.
    pub(crate) fn insert(&mut self, segments: &[Segment<'_>], endpoint: Arc<dyn Endpoint>) {
        let Some((first, rest)) = segments.split_first() else {
            self.endpoints.push((endpoint.verb(), endpoint));
            return;
        };

        let child = match first {
            Segment::Variable(name) => {
                let index = match self
                    .param_children
                    .iter()
                    .position(|c| c.param_name.as_deref() == Some(*name))
                {
                    Some(index) => index,
                    None => {
                        self.param_children
                            .push(RadixNode::new(Box::from(""), Some(Arc::from(*name))));
                        self.param_children.len() - 1
                    }
                };
                &mut self.param_children[index]
            }
            Segment::Literal(literal) => {
                let index = match self.children.iter().position(|c| &*c.segment == *literal) {
                    Some(index) => index,
                    None => {
                        self.children.push(RadixNode::new(Box::from(*literal), None));
                        self.children.len() - 1
                    }
                };
                &mut self.children[index]
            }
        };
        child.insert(rest, endpoint);
    }

    /// Find the endpoint for `verb` at `segments`, binding variables into
    /// `vars`. On failure `vars` is left as it was on entry.
    pub(crate) fn search(
        &self,
        segments: &[&str],
        verb: &Method,
        vars: &mut PathVariables,
    ) -> Option<&Arc<dyn Endpoint>> {
        let Some((segment, rest)) = segments.split_first() else {
            return self
                .endpoints
                .iter()
                .find(|(m, _)| m == verb)
                .map(|(_, endpoint)| endpoint);
        };

        for child in &self.children {
            if &*child.segment == *segment {
                if let Some(found) = child.search(rest, verb, vars) {
                    return Some(found);
                }
            }
        }

        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                let mark = vars.len();
                vars.push(Arc::clone(name), segment);
                if let Some(found) = child.search(rest, verb, vars) {
                    return Some(found);
                }
                vars.truncate(mark);
            }
        }

        None
    }
}
