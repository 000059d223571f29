//! Maps each library crate's narrow error type onto `dms_error::AppError`
//! at the HTTP boundary, the way the teacher's `control::error` module
//! turns `sqlx::Error` into a status code: the conversion logic lives
//! once, here, rather than duplicated in every handler.

pub use dms_error::AppError;

pub fn from_confirm(err: dms_confirm::ConfirmError) -> AppError {
    use dms_confirm::ConfirmError as E;
    match err {
        E::DocumentNotFound(id) => AppError::NotFound(format!("document {id}")),
        E::SchemaNotFound(id) => AppError::NotFound(format!("schema for document {id}")),
        E::NotOwner => AppError::Forbidden("only the document owner may perform this action".to_string()),
        E::Locked => AppError::Validation("document is locked and cannot be confirmed again".to_string()),
        E::NoOriginalUploaded => {
            AppError::Validation("keep_original requested but no original pdf was uploaded".to_string())
        }
        E::MissingEntityId(field) => AppError::Validation(format!("field '{field}' references an entity with no id")),
        E::UnknownEntity(field, entity) => {
            AppError::Validation(format!("field '{field}' references unknown entity '{entity}'"))
        }
        E::DisplayNameTooShort => AppError::Validation("display_name must be at least 3 characters".to_string()),
        E::Graph(e) => AppError::Graph(e.into()),
        E::Store(e) => AppError::Graph(e.into()),
        E::Identity(e) => AppError::Graph(e.into()),
        E::Serde(e) => AppError::Serde(e),
    }
}

pub fn from_search(err: dms_search::SearchError) -> AppError {
    use dms_search::SearchError as E;
    match err {
        E::DocumentNotFound(id) => AppError::NotFound(format!("document {id}")),
        E::Forbidden => AppError::Forbidden("no scopes resolved for this request".to_string()),
        E::ObjectNotFound => AppError::NotFound("requested object".to_string()),
        E::Graph(e) => AppError::Graph(e.into()),
        E::Store(e) => AppError::Graph(e.into()),
        E::Authz(e) => AppError::Graph(e.into()),
        E::Serde(e) => AppError::Serde(e),
    }
}

pub fn from_authz(err: dms_authz::AuthzError) -> AppError {
    use dms_authz::AuthzError as E;
    match err {
        E::MissingToken => AppError::Forbidden("no bearer token presented".to_string()),
        E::InvalidToken(e) => AppError::Forbidden(format!("token signature verification failed: {e}")),
        E::KeysUnavailable => AppError::Unavailable("validation keys unavailable".to_string()),
        E::Jwks(msg) => AppError::Unavailable(format!("jwks fetch failed: {msg}")),
        E::Cache(msg) => AppError::Unavailable(format!("session cache error: {msg}")),
        E::Graph(e) => AppError::Graph(e.into()),
    }
}

pub fn from_store(err: dms_objectstore::StoreError) -> AppError {
    AppError::Graph(err.into())
}

pub fn from_graph(err: dms_graph::GraphError) -> AppError {
    AppError::Graph(err.into())
}
