//! CLI entry points, generalized from the teacher's own
//! `control::cmd::{serve, setup}` module split: a `clap` subcommand per
//! runnable mode. `serve` is the only one this crate implements in full —
//! `dms-service`'s scope is the HTTP/Kafka shell, not a seed/setup job
//! (spec §1: "the master-data sync job" is an external collaborator).

use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;
use tokio::runtime::Runtime;
use tracing::info;

use dms_authz::{InMemorySessionCache, RedisSessionCache, SessionCache};
use dms_config::Settings;
use dms_graph::{ArangoStore, GraphStore};
use dms_identity::{AzureDirectoryClient, DirectoryClient};
use dms_objectstore::ObjectBucket;

use crate::context::AppContext;
use crate::routes::routes;
use crate::shutdown;

#[derive(clap::Parser, Debug)]
#[command(name = "dms-service", about = "Document lifecycle engine HTTP + Kafka shell")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Runs the HTTP API and the OCR ingestion consumer together.
    Serve,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    match cli.command {
        Command::Serve => serve(),
    }
}

fn serve() -> anyhow::Result<()> {
    let settings: &'static Settings = Box::leak(Box::new(dms_config::load_settings().context("loading configuration")?));

    let runtime = Runtime::new().context("building the tokio runtime")?;
    runtime.block_on(async move { run_server(settings).await })
}

async fn run_server(settings: &'static Settings) -> anyhow::Result<()> {
    let graph: Arc<dyn GraphStore> = Arc::new(ArangoStore::new(&settings.arango));
    let bucket = ObjectBucket::from_minio_settings(&settings.minio).context("constructing the object store adapter")?;
    let directory: Arc<dyn DirectoryClient> = Arc::new(AzureDirectoryClient::new(&settings.azure));

    let cache: Arc<dyn SessionCache> = match RedisSessionCache::connect(&settings.auth.redis_url).await {
        Ok(redis) => Arc::new(redis),
        Err(err) => {
            tracing::warn!(error = %err, "failed to connect to the session cache; falling back to an in-memory cache");
            Arc::new(InMemorySessionCache::new())
        }
    };

    let ctx = Arc::new(AppContext::new(graph.clone(), bucket, cache, directory.clone(), settings, None));

    let ingest_bucket = ObjectBucket::from_minio_settings(&settings.minio).context("constructing the ingestion bucket handle")?;
    let ingest_consumer = dms_ingest::build_consumer(&settings.kafka).context("constructing the Kafka consumer")?;
    let ingest_graph = graph.clone();
    let ingest_directory = directory.clone();

    let consumer_task = tokio::spawn(async move {
        info!(topic = dms_ingest::consumer::OCR_RESULTS_TOPIC, "starting OCR ingestion consumer");
        if let Err(err) = dms_ingest::run_consumer(ingest_consumer, ingest_graph.as_ref(), &ingest_bucket, ingest_directory.as_ref()).await
        {
            tracing::error!(error = %err, "OCR ingestion consumer exited with an error");
        }
    });

    let listener = TcpListener::bind(settings.application.address()).context("binding the HTTP listener")?;
    listener.set_nonblocking(true).context("setting the HTTP listener non-blocking")?;
    info!(address = %settings.application.address(), "starting HTTP server");

    axum::serve(tokio::net::TcpListener::from_std(listener)?, routes(ctx).into_make_service())
        .with_graceful_shutdown(shutdown::signal())
        .await
        .context("HTTP server exited with an error")?;

    // Cancellation drains the in-flight message and releases the consumer
    // connection (spec §5); aborting here is safe because `with_graceful_shutdown`
    // has already let any in-flight HTTP response finish.
    consumer_task.abort();

    Ok(())
}
