/// Errors surfaced by the search & authorization engine (spec §4.7).
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("graph store error")]
    Graph(#[from] dms_graph::GraphError),

    #[error("object store error")]
    Store(#[from] dms_objectstore::StoreError),

    #[error("authorization error")]
    Authz(#[from] dms_authz::AuthzError),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("the caller has no team scopes for this status")]
    Forbidden,

    #[error("no object found at the requested storage path")]
    ObjectNotFound,
}

impl From<crate::gate::NoScopesForStatus> for SearchError {
    fn from(_: crate::gate::NoScopesForStatus) -> Self {
        SearchError::Forbidden
    }
}
