use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use http::Method;
use smack::endpoint::{Endpoint, FnEndpoint, NoTransactions};
use smack::pipeline::{IncomingRequest, OutputChannel, Pipeline, Response, ResponseWriter};
use smack::ring::{RingBuilder, WaitStrategy, WorkHandler};
use smack::router::{PathVariables, Router, RoutingDefinition};
use smack::runtime_config::PipelineConfig;
use std::sync::Arc;

fn endpoint(verb: Method) -> Arc<dyn Endpoint> {
    Arc::new(FnEndpoint::new(verb, |_, _| Ok(())))
}

fn graph_router() -> Router {
    let mut routes = RoutingDefinition::new();
    routes
        .add_route("/db/data", endpoint(Method::GET))
        .add_route("/db/data/node", endpoint(Method::POST))
        .add_route("/db/data/node/{id}", endpoint(Method::GET))
        .add_route("/db/data/node/{id}", endpoint(Method::PUT))
        .add_route("/db/data/node/{id}", endpoint(Method::DELETE))
        .add_route("/db/data/node/{id}/properties", endpoint(Method::GET))
        .add_route("/db/data/node/{id}/properties/{key}", endpoint(Method::PUT))
        .add_route("/db/data/node/{id}/relationships", endpoint(Method::POST))
        .add_route(
            "/db/data/node/{id}/relationships/{direction}/{types}",
            endpoint(Method::GET),
        )
        .add_route("/db/data/relationship/types", endpoint(Method::GET))
        .add_route("/db/data/relationship/{id}", endpoint(Method::GET))
        .add_route(
            "/db/data/index/node/{name}/{key}/{value}",
            endpoint(Method::GET),
        );
    routes.compile_routes().expect("routes compile")
}

fn bench_route_match(c: &mut Criterion) {
    let router = graph_router();
    let test_paths = [
        (Method::GET, "/db/data/node/123"),
        (Method::PUT, "/db/data/node/123/properties/name"),
        (Method::GET, "/db/data/node/7/relationships/out/KNOWS"),
        (Method::GET, "/db/data/relationship/types"),
        (Method::GET, "/db/data/index/node/people/name/neo"),
        (Method::GET, "/db/data/nowhere/at/all"),
    ];

    c.bench_function("route_match", |b| {
        let mut vars = PathVariables::new();
        b.iter(|| {
            for (verb, path) in &test_paths {
                let res = router.route_into(verb, path, &mut vars);
                black_box(&res);
            }
        })
    });
}

fn bench_ring_work_pool(c: &mut Criterion) {
    const EVENTS: u64 = 100_000;
    let mut group = c.benchmark_group("ring");
    group.throughput(Throughput::Elements(EVENTS));

    for workers in [1usize, 4] {
        group.bench_function(format!("work_pool_{workers}"), |b| {
            b.iter_batched(
                || {
                    let handlers: Vec<Box<dyn WorkHandler<u64>>> = (0..workers)
                        .map(|_| {
                            Box::new(|slot: &mut u64, _: i64| {
                                black_box(*slot);
                            }) as Box<dyn WorkHandler<u64>>
                        })
                        .collect();
                    RingBuilder::new("bench", 1024, WaitStrategy::Yielding, || 0u64)
                        .work_pool("pool", handlers)
                        .start()
                        .expect("ring starts")
                },
                |(mut publisher, running)| {
                    for i in 0..EVENTS {
                        publisher.publish_with(|slot, _| *slot = i);
                    }
                    running.shutdown();
                },
                BatchSize::PerIteration,
            );
        });
    }
    group.finish();
}

struct Discard;

impl ResponseWriter for Discard {
    fn write_response(&self, _connection: u64, response: &Response<'_>) -> std::io::Result<()> {
        black_box(response.body.len());
        Ok(())
    }
}

fn bench_pipeline_publish(c: &mut Criterion) {
    const REQUESTS: u64 = 50_000;
    let mut group = c.benchmark_group("pipeline");
    group.throughput(Throughput::Elements(REQUESTS));
    group.sample_size(20);

    group.bench_function("publish_noop", |b| {
        let writer: Arc<dyn ResponseWriter> = Arc::new(Discard);
        let channels: Vec<OutputChannel> = (0..16)
            .map(|id| OutputChannel::new(id, Arc::clone(&writer)))
            .collect();
        b.iter_batched(
            || {
                Pipeline::start(
                    graph_router(),
                    PipelineConfig::new(1024, WaitStrategy::Yielding, 2),
                    Arc::new(NoTransactions),
                )
                .expect("pipeline starts")
            },
            |mut pipeline| {
                for channel in channels.iter().cycle().take(REQUESTS as usize) {
                    pipeline.publish(IncomingRequest::new(
                        &Method::GET,
                        "/db/data/node/42",
                        b"",
                        channel,
                    ));
                }
                pipeline.shutdown();
            },
            BatchSize::PerIteration,
        );
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_route_match,
    bench_ring_work_pool,
    bench_pipeline_publish
);
criterion_main!(benches);
