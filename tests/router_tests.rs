#![allow(clippy::unwrap_used, clippy::expect_used)]

use http::Method;
use smack::endpoint::{Endpoint, FnEndpoint};
use smack::error::RouteError;
use smack::router::{RouteProvider, Router, RoutingDefinition};
use std::sync::Arc;

fn endpoint(verb: Method) -> Arc<dyn Endpoint> {
    Arc::new(FnEndpoint::new(verb, |_, _| Ok(())))
}

/// Graph-database style REST surface mounted under `/db/data`.
struct GraphResource;

impl RouteProvider for GraphResource {
    fn define_routes(&self, routes: &mut RoutingDefinition) {
        routes
            .add_route("/", endpoint(Method::GET))
            .add_route("/node", endpoint(Method::POST))
            .add_route("/node/{id}", endpoint(Method::GET))
            .add_route("/node/{id}", endpoint(Method::DELETE))
            .add_route("/node/{id}/properties", endpoint(Method::GET))
            .add_route("/node/{id}/properties", endpoint(Method::PUT))
            .add_route("/node/{id}/properties/{key}", endpoint(Method::GET))
            .add_route("/node/{id}/relationships", endpoint(Method::POST))
            .add_route("/node/{id}/relationships/{direction}", endpoint(Method::GET))
            .add_route("/relationship/{id}", endpoint(Method::GET))
            .add_route("/relationship/{id}", endpoint(Method::DELETE))
            .add_route("/relationship/types", endpoint(Method::GET));
    }
}

fn graph_router() -> Router {
    let mut def = RoutingDefinition::new();
    def.add_provider("/db/data", &GraphResource);
    def.compile_routes().unwrap()
}

#[test]
fn test_graph_routes_resolve() {
    let router = graph_router();
    assert_eq!(router.len(), 12);

    let cases = [
        (Method::GET, "/db/data", vec![]),
        (Method::POST, "/db/data/node", vec![]),
        (Method::GET, "/db/data/node/17", vec![("id", "17")]),
        (Method::DELETE, "/db/data/node/17", vec![("id", "17")]),
        (Method::PUT, "/db/data/node/3/properties", vec![("id", "3")]),
        (
            Method::GET,
            "/db/data/node/3/properties/name",
            vec![("id", "3"), ("key", "name")],
        ),
        (
            Method::GET,
            "/db/data/node/3/relationships/out",
            vec![("id", "3"), ("direction", "out")],
        ),
        (Method::GET, "/db/data/relationship/9", vec![("id", "9")]),
        (Method::GET, "/db/data/relationship/types", vec![]),
    ];

    for (verb, path, expected) in cases {
        let hit = router
            .route(&verb, path)
            .unwrap_or_else(|e| panic!("{verb} {path} should route: {e}"));
        assert_eq!(hit.endpoint.verb(), verb);
        let got: Vec<(&str, &str)> = hit.path_variables.iter().collect();
        assert_eq!(got, expected, "variables for {verb} {path}");
    }
}

#[test]
fn test_graph_routes_miss() {
    let router = graph_router();
    let misses = [
        (Method::GET, "/db/data/node"),
        (Method::PUT, "/db/data/node/1"),
        (Method::GET, "/db/data/node/1/relationships"),
        (Method::GET, "/db/data/node/1/properties/name/extra"),
        (Method::GET, "/node/1"),
        (Method::PATCH, "/db/data/relationship/9"),
    ];
    for (verb, path) in misses {
        match router.route(&verb, path) {
            Err(RouteError::ResourceNotFound { verb: v, path: p }) => {
                assert_eq!(v, verb);
                assert_eq!(p, path);
            }
            other => panic!("{verb} {path}: expected not found, got {other:?}"),
        }
    }
}

#[test]
fn test_literal_segment_preferred_over_variable() {
    let router = graph_router();
    let hit = router
        .route(&Method::GET, "/db/data/relationship/types")
        .unwrap();
    assert!(hit.path_variables.get("id").is_none());

    // DELETE only exists on the placeholder branch
    let hit = router
        .route(&Method::DELETE, "/db/data/relationship/types")
        .unwrap();
    assert_eq!(hit.path_variables.get("id"), Some("types"));
}

#[test]
fn test_invalid_patterns_rejected_at_compile() {
    for pattern in ["/node/{}", "/node/n{id}", "/node/{id"] {
        let mut def = RoutingDefinition::new();
        def.add_route(pattern, endpoint(Method::GET));
        match def.compile_routes() {
            Err(RouteError::InvalidPattern { pattern: p, .. }) => assert_eq!(p, pattern),
            other => panic!("{pattern}: expected invalid pattern, got {other:?}"),
        }
    }
}

#[test]
fn test_same_pattern_different_verbs_is_not_duplicate() {
    let mut def = RoutingDefinition::new();
    def.add_route("/node/{id}", endpoint(Method::GET))
        .add_route("/node/{id}", endpoint(Method::PUT))
        .add_route("/node/{id}", endpoint(Method::DELETE));
    let router = def.compile_routes().unwrap();
    assert_eq!(router.len(), 3);
    let verbs: Vec<&Method> = router.routes().map(|(verb, _)| verb).collect();
    assert_eq!(verbs, [&Method::GET, &Method::PUT, &Method::DELETE]);
}

#[test]
fn test_renamed_placeholder_is_duplicate() {
    let mut def = RoutingDefinition::new();
    def.add_route("/db/data/node/{id}", endpoint(Method::GET))
        .add_route("/db/data/node/{node_id}", endpoint(Method::GET));
    match def.compile_routes() {
        Err(RouteError::DuplicateRoute { verb, pattern }) => {
            assert_eq!(verb, Method::GET);
            assert_eq!(pattern, "/db/data/node/{node_id}");
        }
        other => panic!("expected duplicate route, got {other:?}"),
    }

    // Same shape under another verb, or different names that diverge later, still compile
    let mut def = RoutingDefinition::new();
    def.add_route("/node/{id}", endpoint(Method::GET))
        .add_route("/node/{node_id}", endpoint(Method::DELETE))
        .add_route("/users/{user_id}/posts", endpoint(Method::GET))
        .add_route("/users/{id}/comments", endpoint(Method::GET));
    let router = def.compile_routes().unwrap();
    let hit = router.route(&Method::DELETE, "/node/5").unwrap();
    assert_eq!(hit.path_variables.get("node_id"), Some("5"));
    let hit = router.route(&Method::GET, "/users/9/comments").unwrap();
    assert_eq!(hit.path_variables.get("id"), Some("9"));
    assert!(hit.path_variables.get("user_id").is_none());
}

#[test]
fn test_nested_definitions_compose() {
    let mut inner = RoutingDefinition::new();
    inner.add_route("{id}", endpoint(Method::GET));

    let mut middle = RoutingDefinition::new();
    middle.add_routes("node", &inner);

    let mut outer = RoutingDefinition::new();
    outer.add_routes("/db/data/", &middle);
    let router = outer.compile_routes().unwrap();

    let patterns: Vec<&str> = router.routes().map(|(_, p)| p).collect();
    assert_eq!(patterns, ["/db/data/node/{id}"]);
    assert!(router.route(&Method::GET, "/db/data/node/5").is_ok());
}

#[test]
fn test_write_routes_lists_registration_order() {
    let mut def = RoutingDefinition::new();
    def.add_route("/db/data/node/{id}", endpoint(Method::GET))
        .add_route("/db/data/node", endpoint(Method::POST))
        .add_route("db/data/node/{id}/", endpoint(Method::DELETE));
    let router = def.compile_routes().unwrap();

    let mut out = Vec::new();
    router.write_routes(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "[routes] count=3\n\
         [route] GET /db/data/node/{id}\n\
         [route] POST /db/data/node\n\
         [route] DELETE /db/data/node/{id}\n"
    );
}

#[test]
fn test_router_shared_across_threads() {
    let router = graph_router();
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let router = router.clone();
            std::thread::spawn(move || {
                for i in 0..1_000 {
                    let path = format!("/db/data/node/{}/properties/k{t}", i);
                    let hit = router.route(&Method::GET, &path).unwrap();
                    assert_eq!(hit.path_variables.get("id"), Some(i.to_string().as_str()));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn test_empty_definition_routes_nothing() {
    let router = RoutingDefinition::new().compile_routes().unwrap();
    assert!(router.is_empty());
    assert!(router.route(&Method::GET, "/").is_err());
}
