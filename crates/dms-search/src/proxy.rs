//! The authenticated download proxy (spec §4.7.6): resolves a requested
//! object path back to its owning document, walks the authorization
//! ladder, and records a best-effort audit row.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;

use dms_authz::{resolve_team_entity_keys, WILDCARD_TEAM};
use dms_graph::{Direction, GraphStore};
use dms_types::edges::{AUDIT_DOWNLOADS, BELONGS_TO, DOCUMENTS, FILE_LOCATED_IN};
use dms_types::Document;

use crate::error::SearchError;

/// Finds the document whose storage record names `object_path`, trying
/// both the bucket-qualified and bucket-relative forms (spec §4.7.6 step
/// 1: "with and without bucket prefix").
pub async fn resolve_document_by_storage_path(
    graph: &dyn GraphStore,
    bucket_name: &str,
    object_path: &str,
) -> Result<Option<Document>, SearchError> {
    let candidates = candidate_paths(bucket_name, object_path);

    let rows = graph
        .aql_query(
            r#"
            FOR doc IN @@collection
                FILTER doc.storage.pdf_path IN @candidates
                    OR doc.storage.pdf_original_path IN @candidates
                    OR doc.storage.json_path IN @candidates
                    OR doc.storage.text_path IN @candidates
                LIMIT 1
                RETURN doc
            "#,
            json!({ "@collection": DOCUMENTS, "candidates": candidates }),
        )
        .await?;

    rows.into_iter()
        .next()
        .map(serde_json::from_value::<Document>)
        .transpose()
        .map_err(SearchError::from)
}

fn candidate_paths(bucket_name: &str, object_path: &str) -> Vec<String> {
    let prefix = format!("{bucket_name}/");
    if let Some(stripped) = object_path.strip_prefix(&prefix) {
        vec![object_path.to_string(), stripped.to_string()]
    } else {
        vec![object_path.to_string(), format!("{prefix}{object_path}")]
    }
}

/// The authorization ladder of spec §4.7.6 step 2: public, then owner,
/// then wildcard `document.read` scope, then graph reachability within
/// two `{file_located_in, belongs_to}` hops of a team-resolved entity key.
pub async fn authorize_download(
    graph: &dyn GraphStore,
    document: &Document,
    caller_id: &str,
    read_scopes: &[String],
) -> Result<bool, SearchError> {
    if document.is_public {
        return Ok(true);
    }
    if document.owner.id == caller_id {
        return Ok(true);
    }
    if read_scopes.iter().any(|s| s == WILDCARD_TEAM) {
        return Ok(true);
    }
    if read_scopes.is_empty() {
        return Ok(false);
    }

    let allowed_entity_keys = resolve_team_entity_keys(graph, read_scopes).await?;
    if allowed_entity_keys.is_empty() {
        return Ok(false);
    }

    let doc_handle = format!("{DOCUMENTS}/{}", document.key);
    let neighbors = graph
        .traverse(&doc_handle, 1, 2, Direction::Outbound, &[FILE_LOCATED_IN, BELONGS_TO])
        .await?;

    Ok(neighbors.iter().any(|v| {
        v.get("_key")
            .and_then(|k| k.as_str())
            .map(|k| allowed_entity_keys.iter().any(|a| a == k))
            .unwrap_or(false)
    }))
}

/// Content-Type inference table for the download proxy (SPEC_FULL §4 item
/// 5, carried from the original's `storage/router.py`).
pub fn content_type_for_extension(path: &str) -> &'static str {
    let ext = path.rsplit('.').next().unwrap_or("").to_lowercase();
    match ext.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

/// `Content-Disposition: inline; filename=...` (SPEC_FULL §4 item 6): lets
/// browsers render PDFs in place instead of downloading them.
pub fn content_disposition_inline(path: &str) -> String {
    let filename = path.rsplit('/').next().unwrap_or(path);
    format!("inline; filename=\"{filename}\"")
}

/// `audit_downloads` append-only record (spec §3.1, §4.7.6 step 3).
#[derive(Debug, Clone, Serialize)]
pub struct AuditDownloadRecord {
    pub document_id: String,
    pub user_id: String,
    pub ip_address: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Best-effort append to `audit_downloads` (spec §4.7.6 step 3, §5
/// "best-effort append that must not delay the response"). Errors are
/// returned to the caller rather than swallowed here; the fire-and-forget
/// contract (bounded queue, drop-on-overflow) is the service layer's
/// responsibility (SPEC_FULL §9), not this engine function's.
pub async fn append_audit_download(
    graph: &dyn GraphStore,
    record: AuditDownloadRecord,
    key: &str,
) -> Result<(), SearchError> {
    let payload = serde_json::to_value(&record)?;
    graph.insert_vertex(AUDIT_DOWNLOADS, key, payload).await?;
    Ok(())
}
