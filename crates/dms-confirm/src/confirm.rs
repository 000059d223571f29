//! The confirmation pipeline itself (spec §4.6.2) and its read-side
//! companion, integrity re-verification (spec §4.6.3).

use chrono::Utc;
use dms_graph::{Direction, GraphStore};
use dms_identity::IdentityResolver;
use dms_objectstore::bucket::ObjectBucket;
use dms_types::document::{Document, ValidatedMetadataValue};
use dms_types::edges::{edge_key, COMPLIES_WITH, DOCUMENTS, FILE_LOCATED_IN, REFERENCES, USA_ESQUEMA};
use dms_types::storage::IntegrityVerification;
use serde_json::{Map, Value};

use crate::error::ConfirmError;
use crate::{archive, integrity, quality, sanitize};

/// Everything a single confirmation call needs (spec §4.6.2 request body).
pub struct ConfirmRequest {
    pub doc_id: String,
    pub caller_id: String,
    pub metadata: Map<String, Value>,
    pub display_name: Option<String>,
    pub is_public: bool,
    pub keep_original: bool,
}

/// Dependencies threaded through confirmation and verification; borrowed
/// for the lifetime of a single call rather than owned, mirroring
/// `IdentityResolver`'s own borrow-everything shape.
pub struct ConfirmContext<'a> {
    pub graph: &'a dyn GraphStore,
    pub bucket: &'a ObjectBucket,
    pub resolver: &'a IdentityResolver<'a>,
    pub integrity_secret: &'a [u8],
}

/// Loads a `documents` vertex and re-derives the three edge-only fields
/// (`schema_id`, `context_entity_key`, `required_document_key`) that are
/// never persisted on the vertex itself (spec §3.1).
async fn load_document(graph: &dyn GraphStore, doc_key: &str) -> Result<Document, ConfirmError> {
    let raw = graph
        .get_vertex(DOCUMENTS, doc_key)
        .await?
        .ok_or_else(|| ConfirmError::DocumentNotFound(doc_key.to_string()))?;
    let mut document: Document = serde_json::from_value(raw)?;

    document.schema_id = neighbor_key(graph, doc_key, USA_ESQUEMA).await?;
    document.context_entity_key = neighbor_key(graph, doc_key, FILE_LOCATED_IN).await?;
    document.required_document_key = neighbor_key(graph, doc_key, COMPLIES_WITH).await?;

    Ok(document)
}

async fn neighbor_key(
    graph: &dyn GraphStore,
    doc_key: &str,
    edge_collection: &str,
) -> Result<Option<String>, ConfirmError> {
    let doc_handle = format!("{DOCUMENTS}/{doc_key}");
    let chain = graph
        .traverse(&doc_handle, 1, 1, Direction::Outbound, &[edge_collection])
        .await?;
    Ok(chain
        .into_iter()
        .find_map(|v| v.get("_key").and_then(|k| k.as_str()).filter(|k| *k != doc_key).map(String::from)))
}

/// Runs the full eight-step confirmation pipeline (spec §4.6.2) and
/// returns the confirmed document.
pub async fn confirm(ctx: &ConfirmContext<'_>, req: ConfirmRequest) -> Result<Document, ConfirmError> {
    if let Some(name) = &req.display_name {
        if name.trim().chars().count() < 3 {
            return Err(ConfirmError::DisplayNameTooShort);
        }
    }

    // Step 1: snapshot.
    let mut document = load_document(ctx.graph, &req.doc_id).await?;
    if document.owner.id != req.caller_id {
        return Err(ConfirmError::NotOwner);
    }
    if document.is_locked {
        return Err(ConfirmError::Locked);
    }

    // Step 2: storage selection.
    document.keep_original = req.keep_original;
    if req.keep_original {
        let original = document
            .storage
            .pdf_original_path
            .clone()
            .ok_or(ConfirmError::NoOriginalUploaded)?;
        document.storage.pdf_path = Some(original);
        document.storage.primary_source = Some("original".to_string());
        document.storage.pdfa_conversion_required = Some(true);
        document.storage.pdfa_conversion_status = Some("pending".to_string());
    } else {
        document.storage.primary_source = Some("ocr_pdfa".to_string());
        if document.storage.pdf_path.is_none() {
            return Err(ConfirmError::NoOriginalUploaded);
        }
    }

    // Step 3: archive promotion.
    let archive_prefix = archive::build_archive_prefix(
        &document.naming,
        document.context_snapshot.process_name.as_deref(),
        document.context_snapshot.required_doc_name.as_deref(),
        &document.key,
    );
    archive::promote_from_stage(ctx.bucket, &mut document.storage, &archive_prefix).await?;
    let selected_pdf_path = document.storage.pdf_path.clone();

    // Step 4: schema lookup, then entity existence.
    let schema = quality::schema_for_document(ctx.graph, &document.key)
        .await?
        .ok_or_else(|| ConfirmError::SchemaNotFound(document.key.clone()))?;
    sanitize::ensure_entities_exist(ctx.graph, ctx.resolver, &schema, &req.metadata).await?;

    // Step 5: sanitize.
    let validated_metadata = sanitize::sanitize_metadata(&schema, &req.metadata);

    // Step 6: integrity manifest.
    let confirmed_at = Utc::now();
    let integrity_record = integrity::build_integrity_manifest(
        ctx.bucket,
        ctx.integrity_secret,
        &document.key,
        &validated_metadata,
        &req.caller_id,
        confirmed_at,
        req.keep_original,
        selected_pdf_path.as_deref(),
    )
    .await?;

    // Step 7: persist — display_name swap logic, then the full update.
    apply_display_name_update(&mut document, req.display_name.as_deref());

    document.validated_metadata = validated_metadata;
    document.status = dms_types::document::DocumentStatus::Confirmed;
    document.integrity_warnings = vec![];
    document.manually_validated_at = Some(confirmed_at);
    document.confirmed_at = Some(confirmed_at);
    document.confirmed_by = Some(req.caller_id.clone());
    document.is_public = req.is_public;
    document.is_locked = true;
    document.integrity = integrity_record;

    let payload = serde_json::to_value(&document)?;
    ctx.graph.upsert_vertex(DOCUMENTS, &document.key, payload).await?;

    // Step 8: semantic references.
    add_semantic_references(ctx.graph, &document).await?;

    Ok(document)
}

/// `documents.display_name`/`snap_context_name` swap (spec §4.6.2 step 7):
/// when a new `display_name` is supplied and differs from the current
/// one, the old value is preserved in `snap_context_name` (only if that
/// slot was still empty) before the new name is adopted.
fn apply_display_name_update(document: &mut Document, requested: Option<&str>) {
    let Some(requested) = requested else { return };
    let current = document
        .display_name
        .clone()
        .unwrap_or_else(|| document.naming.display_name.clone());

    if current == requested {
        return;
    }

    if document.snap_context_name.as_deref().map(str::is_empty).unwrap_or(true) {
        document.snap_context_name = Some(current);
    }
    document.display_name = Some(requested.to_string());
    document.naming.display_name = requested.to_string();
}

fn metadata_entity_id(value: &ValidatedMetadataValue) -> Option<&str> {
    match value {
        ValidatedMetadataValue::EntityRef { id, .. } => Some(id.as_str()),
        _ => None,
    }
}

/// Upserts a `references` edge from the document to every entity named in
/// its validated metadata, skipping the entity the document already lives
/// under via `file_located_in` (spec §4.6.2 step 8).
async fn add_semantic_references(graph: &dyn GraphStore, document: &Document) -> Result<(), ConfirmError> {
    let doc_handle = format!("{DOCUMENTS}/{}", document.key);
    for value in document.validated_metadata.values() {
        let Some(id) = metadata_entity_id(value) else { continue };
        if id.is_empty() {
            continue;
        }
        if document.context_entity_key.as_deref() == Some(id) {
            continue;
        }
        let entity_handle = format!("{}/{id}", dms_types::edges::ENTITIES);
        graph
            .upsert_edge(REFERENCES, &doc_handle, &entity_handle, &edge_key(&document.key, id), serde_json::json!({}))
            .await?;
    }
    Ok(())
}

/// Re-verifies a confirmed document's integrity manifest (spec §4.6.3).
/// Requires the document to be public or the caller to be its owner.
pub async fn verify(ctx: &ConfirmContext<'_>, doc_id: &str, caller_id: &str) -> Result<IntegrityVerification, ConfirmError> {
    let document = load_document(ctx.graph, doc_id).await?;
    if !document.is_public && document.owner.id != caller_id {
        return Err(ConfirmError::NotOwner);
    }
    integrity::verify_integrity(ctx.bucket, ctx.integrity_secret, &document.validated_metadata, &document.integrity).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use dms_identity::InMemoryDirectoryClient;
    use dms_types::document::{ContextSnapshot, DocumentStatus, Owner};
    use dms_types::edges::{ENTITIES, META_SCHEMAS};
    use dms_types::naming::NamingRecord;
    use dms_types::schema::{DataType, EntityTypeKey, EntityTypeKeyField, MetaSchema, SchemaField};
    use dms_types::storage::{IntegrityRecord, StorageRecord};
    use serde_json::json;

    fn naming() -> NamingRecord {
        NamingRecord {
            name_path: "Facultad".to_string(),
            code_path: "Facultad".to_string(),
            code_numeric_path: "01".to_string(),
            name_code: "FAC".to_string(),
            name_code_numeric: "01".to_string(),
            display_name: "Facultad - Documento".to_string(),
            timestamp_tag: "20260101".to_string(),
            required_document_code: None,
            path_nodes: vec![],
        }
    }

    async fn seed_document(graph: &InMemoryGraphStore, owner_id: &str, locked: bool) {
        graph.upsert_vertex(ENTITIES, "cs", json!({ "name": "Computer Science", "type": "carrera" })).await.unwrap();
        graph
            .upsert_vertex(
                META_SCHEMAS,
                "schema-1",
                serde_json::to_value(MetaSchema {
                    key: "schema-1".to_string(),
                    name: "Admission".to_string(),
                    version: 1,
                    fields: vec![SchemaField {
                        field_key: "career".to_string(),
                        label: "Carrera".to_string(),
                        data_type: DataType::Json,
                        is_required: false,
                        sort_order: 1,
                        type_input: None,
                        entity_type: Some(EntityTypeKeyField { key: EntityTypeKey::Career }),
                    }],
                })
                .unwrap(),
            )
            .await
            .unwrap();

        let now = Utc::now();
        let document = Document {
            key: "T1".to_string(),
            owner: Owner { id: owner_id.to_string(), name: "Juan".to_string(), email: None },
            status: DocumentStatus::Validated,
            original_filename: "doc.pdf".to_string(),
            created_at: now,
            updated_at: now,
            confirmed_at: None,
            confirmed_by: None,
            manually_validated_at: None,
            is_public: false,
            keep_original: false,
            is_locked: locked,
            display_name: Some("Facultad - Documento".to_string()),
            snap_context_name: Some("Computer Science".to_string()),
            naming: naming(),
            storage: StorageRecord {
                pdf_path: Some("stage-validate/u1/T1/pdf_document.pdf".to_string()),
                pdf_original_path: Some("stage-validate/u1/T1/pdf_original_document.pdf".to_string()),
                json_path: None,
                text_path: None,
                pdf_signed_url: None,
                archive_prefix: None,
                storage_tier: Some("stage".to_string()),
                primary_source: Some("ocr_pdfa".to_string()),
                pdfa_conversion_required: None,
                pdfa_conversion_status: None,
            },
            validated_metadata: Default::default(),
            integrity_warnings: vec![],
            context_snapshot: ContextSnapshot {
                entity_name: Some("Computer Science".to_string()),
                entity_type: Some("carrera".to_string()),
                process_code: None,
                process_name: Some("Admission".to_string()),
                required_doc_code: None,
                required_doc_name: Some("Transcript".to_string()),
            },
            integrity: IntegrityRecord::default(),
            context_entity_key: Some("cs".to_string()),
            schema_id: Some("schema-1".to_string()),
            required_document_key: None,
        };
        let payload = serde_json::to_value(&document).unwrap();
        graph.upsert_vertex(DOCUMENTS, "T1", payload).await.unwrap();

        let doc_handle = "documents/T1";
        graph
            .upsert_edge(USA_ESQUEMA, doc_handle, "meta_schemas/schema-1", &edge_key("T1", "schema-1"), json!({}))
            .await
            .unwrap();
        graph
            .upsert_edge(FILE_LOCATED_IN, doc_handle, "entities/cs", &edge_key("T1", "cs"), json!({}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn confirm_archives_validates_and_locks_the_document() {
        let graph = InMemoryGraphStore::new();
        seed_document(&graph, "u1", false).await;

        let bucket = ObjectBucket::in_memory("dms");
        bucket
            .upload(bytes::Bytes::from_static(b"pdf-bytes"), "stage-validate/u1/T1/pdf_document.pdf")
            .await
            .unwrap();

        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);
        let secret = b"integrity-secret";
        let ctx = ConfirmContext { graph: &graph, bucket: &bucket, resolver: &resolver, integrity_secret: secret };

        let mut metadata = Map::new();
        metadata.insert("career".to_string(), json!({ "id": "cs", "name": "Computer Science", "type": "carrera" }));

        let req = ConfirmRequest {
            doc_id: "T1".to_string(),
            caller_id: "u1".to_string(),
            metadata,
            display_name: None,
            is_public: true,
            keep_original: false,
        };

        let confirmed = confirm(&ctx, req).await.unwrap();
        assert_eq!(confirmed.status, DocumentStatus::Confirmed);
        assert!(confirmed.is_locked);
        assert!(confirmed.is_public);
        assert_eq!(confirmed.storage.storage_tier.as_deref(), Some("archive"));
        assert!(confirmed.integrity.manifest.is_some());
        assert_eq!(confirmed.validated_metadata.len(), 1);

        let reference = graph.get_vertex(REFERENCES, &edge_key("T1", "cs")).await.unwrap();
        assert!(reference.is_none(), "context entity must not also get a references edge");
    }

    #[tokio::test]
    async fn confirm_rejects_non_owner() {
        let graph = InMemoryGraphStore::new();
        seed_document(&graph, "u1", false).await;
        let bucket = ObjectBucket::in_memory("dms");
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);
        let ctx = ConfirmContext { graph: &graph, bucket: &bucket, resolver: &resolver, integrity_secret: b"s" };

        let req = ConfirmRequest {
            doc_id: "T1".to_string(),
            caller_id: "someone-else".to_string(),
            metadata: Map::new(),
            display_name: None,
            is_public: false,
            keep_original: false,
        };
        let err = confirm(&ctx, req).await.unwrap_err();
        assert!(matches!(err, ConfirmError::NotOwner));
    }

    #[tokio::test]
    async fn confirm_rejects_already_locked_document() {
        let graph = InMemoryGraphStore::new();
        seed_document(&graph, "u1", true).await;
        let bucket = ObjectBucket::in_memory("dms");
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);
        let ctx = ConfirmContext { graph: &graph, bucket: &bucket, resolver: &resolver, integrity_secret: b"s" };

        let req = ConfirmRequest {
            doc_id: "T1".to_string(),
            caller_id: "u1".to_string(),
            metadata: Map::new(),
            display_name: None,
            is_public: false,
            keep_original: false,
        };
        let err = confirm(&ctx, req).await.unwrap_err();
        assert!(matches!(err, ConfirmError::Locked));
    }

    #[tokio::test]
    async fn confirm_rejects_short_display_name() {
        let graph = InMemoryGraphStore::new();
        seed_document(&graph, "u1", false).await;
        let bucket = ObjectBucket::in_memory("dms");
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);
        let ctx = ConfirmContext { graph: &graph, bucket: &bucket, resolver: &resolver, integrity_secret: b"s" };

        let req = ConfirmRequest {
            doc_id: "T1".to_string(),
            caller_id: "u1".to_string(),
            metadata: Map::new(),
            display_name: Some("ab".to_string()),
            is_public: false,
            keep_original: false,
        };
        let err = confirm(&ctx, req).await.unwrap_err();
        assert!(matches!(err, ConfirmError::DisplayNameTooShort));
    }

    #[tokio::test]
    async fn confirm_without_original_upload_rejects_keep_original() {
        let graph = InMemoryGraphStore::new();
        seed_document(&graph, "u1", false).await;
        // Remove the original so keep_original has nothing to swap to.
        let mut raw = graph.get_vertex(DOCUMENTS, "T1").await.unwrap().unwrap();
        raw["storage"]["pdf_original_path"] = Value::Null;
        graph.upsert_vertex(DOCUMENTS, "T1", raw).await.unwrap();

        let bucket = ObjectBucket::in_memory("dms");
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);
        let ctx = ConfirmContext { graph: &graph, bucket: &bucket, resolver: &resolver, integrity_secret: b"s" };

        let req = ConfirmRequest {
            doc_id: "T1".to_string(),
            caller_id: "u1".to_string(),
            metadata: Map::new(),
            display_name: None,
            is_public: false,
            keep_original: true,
        };
        let err = confirm(&ctx, req).await.unwrap_err();
        assert!(matches!(err, ConfirmError::NoOriginalUploaded));
    }

    #[tokio::test]
    async fn verify_requires_owner_when_not_public() {
        let graph = InMemoryGraphStore::new();
        seed_document(&graph, "u1", false).await;
        let bucket = ObjectBucket::in_memory("dms");
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);
        let ctx = ConfirmContext { graph: &graph, bucket: &bucket, resolver: &resolver, integrity_secret: b"s" };

        let err = verify(&ctx, "T1", "not-the-owner").await.unwrap_err();
        assert!(matches!(err, ConfirmError::NotOwner));
    }
}
