/// Errors surfaced by the graph adapter. Kept narrow and crate-local, the
/// way the teacher's `control::repo` layer returns `sqlx::Error` directly
/// rather than the service-level `AppError`; callers convert with `?` and
/// `dms-error`'s `#[from]` at the HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("arango request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("arango returned an error response: {code} {message}")]
    Arango { code: u16, message: String },

    #[error("failed to (de)serialize graph document: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("vertex not found: {collection}/{key}")]
    NotFound { collection: String, key: String },
}
