//! Publish a fixed number of requests through the pipeline and report
//! requests per second.
//!
//! ```bash
//! SMACK_WAIT_STRATEGY=busy-spin cargo run --release --bin smack-throughput -- \
//!     --requests 2000000 --connections 64
//! ```

use anyhow::{bail, Context, Result};
use clap::Parser;
use http::Method;
use serde_json::json;
use smack::endpoint::{FnEndpoint, NoTransactions};
use smack::logging::{init_logging, LogConfig};
use smack::pipeline::{IncomingRequest, OutputChannel, Pipeline, Response, ResponseWriter};
use smack::ring::WaitStrategy;
use smack::router::RoutingDefinition;
use smack::runtime_config::PipelineConfig;
use smack::strategy::{JsonDeserialization, JsonSerialization};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "smack-throughput")]
#[command(about = "Drive the dispatch pipeline with synthetic load", long_about = None)]
struct Args {
    /// Total requests to publish
    #[arg(short = 'n', long, default_value_t = 1_000_000)]
    requests: u64,

    /// Simulated connections; requests are spread round-robin
    #[arg(short, long, default_value_t = 16)]
    connections: u64,

    /// Ring slots (overrides SMACK_RING_SIZE)
    #[arg(long)]
    ring_size: Option<usize>,

    /// Serialization workers (overrides SMACK_SERIALIZATION_WORKERS)
    #[arg(long)]
    workers: Option<usize>,

    /// busy-spin, yielding, sleeping or blocking (overrides SMACK_WAIT_STRATEGY)
    #[arg(long)]
    wait_strategy: Option<String>,

    /// Route to a JSON echo endpoint instead of the no-op endpoint
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Print the compiled routing table before driving load
    #[arg(long, default_value_t = false)]
    dump_routes: bool,
}

/// Counts responses per status class and discards the bytes.
#[derive(Default)]
struct CountingWriter {
    responses: AtomicU64,
    errors: AtomicU64,
    bytes: AtomicU64,
}

impl ResponseWriter for CountingWriter {
    fn write_response(&self, _connection: u64, response: &Response<'_>) -> io::Result<()> {
        self.responses.fetch_add(1, Ordering::Relaxed);
        self.bytes
            .fetch_add(response.body.len() as u64, Ordering::Relaxed);
        if !response.status.is_success() {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&LogConfig::from_env())?;

    if args.connections == 0 {
        bail!("--connections must be at least 1");
    }

    let mut config = PipelineConfig::from_env();
    if let Some(ring_size) = args.ring_size {
        config.ring_size = ring_size;
    }
    if let Some(workers) = args.workers {
        config.serialization_workers = workers;
    }
    if let Some(name) = &args.wait_strategy {
        config.wait_strategy = WaitStrategy::parse(name)
            .with_context(|| format!("unknown wait strategy '{name}'"))?;
    }

    let mut routes = RoutingDefinition::new();
    routes.add_route(
        "/noop",
        Arc::new(FnEndpoint::new(Method::GET, |_, _| Ok(()))),
    );
    routes.add_route(
        "/db/data/node/{id}",
        Arc::new(
            FnEndpoint::new(Method::PUT, |inv, out| {
                out.ok(json!({ "id": inv.path_variable("id"), "data": inv.content() }));
                Ok(())
            })
            .with_deserialization(JsonDeserialization)
            .with_serialization(JsonSerialization),
        ),
    );
    let router = routes
        .compile_routes()
        .context("Failed to compile routes")?;
    if args.dump_routes {
        router.dump_routes().context("Failed to print routes")?;
    }

    let mut pipeline = Pipeline::start(router, config, Arc::new(NoTransactions))
        .context("Failed to start pipeline")?;

    let writer = Arc::new(CountingWriter::default());
    let channels: Vec<OutputChannel> = (0..args.connections)
        .map(|id| OutputChannel::new(id, Arc::clone(&writer) as Arc<dyn ResponseWriter>))
        .collect();

    let (verb, path, body): (Method, &str, &[u8]) = if args.json {
        (
            Method::PUT,
            "/db/data/node/42",
            br#"{"name":"smack","weight":7}"#.as_slice(),
        )
    } else {
        (Method::GET, "/noop", b"".as_slice())
    };
    let total = usize::try_from(args.requests).context("--requests does not fit in usize")?;

    info!(
        requests = args.requests,
        connections = args.connections,
        ring_size = config.ring_size,
        workers = config.serialization_workers,
        wait_strategy = config.wait_strategy.as_str(),
        "Starting run"
    );

    let started = Instant::now();
    for channel in channels.iter().cycle().take(total) {
        pipeline.publish(IncomingRequest::new(&verb, path, body, channel));
    }
    pipeline.shutdown();
    let elapsed = started.elapsed();

    let responses = writer.responses.load(Ordering::Relaxed);
    if responses != args.requests {
        bail!("expected {} responses, got {responses}", args.requests);
    }

    let secs = elapsed.as_secs_f64();
    let rate = if secs > 0.0 {
        responses as f64 / secs
    } else {
        f64::INFINITY
    };
    println!("requests:     {responses}");
    println!("errors:       {}", writer.errors.load(Ordering::Relaxed));
    println!("body bytes:   {}", writer.bytes.load(Ordering::Relaxed));
    println!("elapsed:      {:.3}s", secs);
    println!("throughput:   {rate:.0} req/s");
    Ok(())
}
