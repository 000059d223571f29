//! Kafka consumer loop for the OCR topic, grounded in the teacher pack's
//! own `rdkafka::consumer::StreamConsumer` wiring (`rde-io::source_kafka`).

use dms_config::KafkaSettings;
use dms_graph::GraphStore;
use dms_identity::DirectoryClient;
use dms_objectstore::ObjectBucket;
use dms_types::edges::META_SCHEMAS;
use dms_types::schema::MetaSchema;
use futures::StreamExt;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::{ClientConfig, Message};
use tracing::{error, warn};

use crate::error::IngestError;

pub const OCR_RESULTS_TOPIC: &str = "ocr-results";
const CONSUMER_GROUP: &str = "dms-ingest";

pub fn build_consumer(settings: &KafkaSettings) -> Result<StreamConsumer, rdkafka::error::KafkaError> {
    ClientConfig::new()
        .set("bootstrap.servers", &settings.bootstrap_servers)
        .set("group.id", CONSUMER_GROUP)
        .set("enable.partition.eof", "false")
        .set("session.timeout.ms", "6000")
        .set("enable.auto.commit", "false")
        .create()
}

/// Drives the OCR ingestion loop until the stream ends: parse, transfer,
/// strictly validate, then build/upsert/link the document (spec §4.5).
/// Offsets commit only after the whole pipeline completes for a message,
/// so a crash mid-pipeline redelivers into an idempotent upsert rather
/// than silently dropping work.
pub async fn run(
    consumer: StreamConsumer,
    graph: &dyn GraphStore,
    bucket: &ObjectBucket,
    directory: &dyn DirectoryClient,
) -> Result<(), IngestError> {
    consumer.subscribe(&[OCR_RESULTS_TOPIC])?;
    let mut stream = consumer.stream();

    while let Some(result) = stream.next().await {
        let message = match result {
            Ok(m) => m,
            Err(err) => {
                warn!(error = %err, "kafka error receiving OCR message");
                continue;
            }
        };

        let outcome = match message.payload() {
            Some(payload) => process_payload(payload, graph, bucket, directory).await,
            None => {
                warn!("OCR message had no payload");
                Ok(())
            }
        };

        if let Err(err) = outcome {
            error!(error = %err, "failed to process OCR message");
        }

        if let Err(err) = consumer.commit_message(&message, CommitMode::Async) {
            warn!(error = %err, "failed to commit OCR message offset");
        }
    }

    Ok(())
}

async fn process_payload(
    payload: &[u8],
    graph: &dyn GraphStore,
    bucket: &ObjectBucket,
    directory: &dyn DirectoryClient,
) -> Result<(), IngestError> {
    let raw: crate::message::OcrMessage = serde_json::from_slice(payload)
        .map_err(|e| IngestError::Parse(format!("invalid OCR payload: {e}")))?;
    let parsed = crate::parse::parse(raw)?;

    let artifacts = crate::transfer::transfer(bucket, &parsed).await;

    let schema_doc = graph
        .get_vertex(META_SCHEMAS, &parsed.schema_info.id)
        .await?
        .ok_or_else(|| IngestError::SchemaNotFound(parsed.schema_info.id.clone()))?;
    let schema: MetaSchema = serde_json::from_value(schema_doc)?;

    let outcome =
        crate::validate::validate_strict(graph, directory, &schema, &parsed.ocr_metadata).await;

    crate::persist::persist(graph, &parsed, artifacts, outcome).await?;

    Ok(())
}
