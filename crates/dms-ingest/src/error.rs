#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// Missing `task_id` (spec §4.5 step 1: "No partial parsing: missing
    /// `task_id` is a fatal parse error").
    #[error("fatal parse error: {0}")]
    Parse(String),

    #[error("schema {0} not found")]
    SchemaNotFound(String),

    #[error("graph store error")]
    Graph(#[from] dms_graph::GraphError),

    #[error("identity resolution error")]
    Identity(#[from] dms_identity::IdentityError),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),

    #[error("kafka error")]
    Kafka(#[from] rdkafka::error::KafkaError),
}
