#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    #[error("graph store error")]
    Graph(#[from] dms_graph::GraphError),

    #[error("session cache error: {0}")]
    Cache(String),

    #[error("jwks fetch failed: {0}")]
    Jwks(String),

    #[error("validation keys unavailable")]
    KeysUnavailable,

    #[error("token signature verification failed: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),

    #[error("no bearer token presented")]
    MissingToken,
}
