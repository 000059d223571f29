/// Errors surfaced by the confirmation engine (spec §4.6). Kept narrow and
/// crate-local; callers convert with `?` and `dms-error`'s `#[from]` at the
/// HTTP boundary.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("graph store error")]
    Graph(#[from] dms_graph::GraphError),

    #[error("object store error")]
    Store(#[from] dms_objectstore::StoreError),

    #[error("identity resolution error")]
    Identity(#[from] dms_identity::IdentityError),

    #[error("json serialization error")]
    Serde(#[from] serde_json::Error),

    #[error("document not found: {0}")]
    DocumentNotFound(String),

    #[error("schema not found for document {0}")]
    SchemaNotFound(String),

    #[error("only the document owner may perform this action")]
    NotOwner,

    #[error("document is locked and cannot be confirmed again")]
    Locked,

    #[error("keep_original requested but no original pdf was uploaded")]
    NoOriginalUploaded,

    #[error("field '{0}' references an entity with no id")]
    MissingEntityId(String),

    #[error("field '{0}' references unknown entity '{1}'")]
    UnknownEntity(String, String),

    #[error("display_name must be at least 3 characters")]
    DisplayNameTooShort,
}
