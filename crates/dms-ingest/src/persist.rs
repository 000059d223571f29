use dms_graph::GraphStore;
use dms_types::document::{ContextSnapshot, Document, Owner};
use dms_types::edges::{
    edge_key, COMPLIES_WITH, DOCUMENTS, ENTITIES, FILE_LOCATED_IN, META_SCHEMAS,
    REQUIRED_DOCUMENTS, USA_ESQUEMA,
};
use dms_types::storage::{IntegrityRecord, StorageRecord};
use serde_json::json;

use crate::error::IngestError;
use crate::parse::ParsedIngest;
use crate::transfer::TransferredArtifacts;
use crate::validate::ValidationOutcome;

/// Naming (step 5), record assembly (step 6), the idempotent upsert keyed
/// by `task_id` (step 7), and the three structural edges in order (step
/// 8: `usa_esquema`, `file_located_in`, `complies_with`) — spec §4.5.
pub async fn persist(
    graph: &dyn GraphStore,
    parsed: &ParsedIngest,
    artifacts: TransferredArtifacts,
    outcome: ValidationOutcome,
) -> Result<Document, IngestError> {
    let naming = dms_naming::build_names(
        graph,
        &parsed.context_values.id,
        Some(&parsed.required_document),
    )
    .await?;

    let now = chrono::Utc::now();
    let document = Document {
        key: parsed.task_id.clone(),
        owner: Owner {
            id: parsed.user_snapshot.id.clone(),
            name: parsed.user_snapshot.name.clone(),
            email: parsed.user_snapshot.email.clone(),
        },
        status: outcome.status,
        original_filename: parsed.filename.clone(),
        created_at: now,
        updated_at: now,
        confirmed_at: None,
        confirmed_by: None,
        manually_validated_at: None,
        is_public: false,
        keep_original: false,
        is_locked: false,
        display_name: Some(naming.display_name.clone()),
        snap_context_name: Some(parsed.context_values.name.clone()),
        naming,
        storage: StorageRecord {
            pdf_path: artifacts.pdf_path,
            pdf_original_path: artifacts.pdf_original_path,
            json_path: artifacts.json_path,
            text_path: artifacts.text_path,
            pdf_signed_url: None,
            archive_prefix: None,
            storage_tier: Some("stage".to_string()),
            primary_source: Some("ocr_pdfa".to_string()),
            pdfa_conversion_required: None,
            pdfa_conversion_status: None,
        },
        validated_metadata: outcome.validated_metadata,
        integrity_warnings: outcome.integrity_warnings,
        context_snapshot: ContextSnapshot {
            entity_name: Some(parsed.context_values.name.clone()),
            entity_type: parsed.context_values.entity_type.clone(),
            process_code: None,
            process_name: None,
            required_doc_code: parsed.required_document.code.clone(),
            required_doc_name: parsed.required_document.name.clone(),
        },
        integrity: IntegrityRecord::default(),
        context_entity_key: Some(parsed.context_values.id.clone()),
        schema_id: Some(parsed.schema_info.id.clone()),
        required_document_key: parsed.required_document.id.clone(),
    };

    // `Document::{context_entity_key, schema_id, required_document_key}`
    // are `#[serde(skip)]` (they live on edges, not the vertex), so the
    // payload upserted here intentionally carries less than `document`
    // itself — keep using the in-memory struct below rather than
    // round-tripping through the stored JSON.
    let payload = serde_json::to_value(&document)?;
    graph.upsert_vertex(DOCUMENTS, &document.key, payload).await?;

    let doc_handle = format!("{DOCUMENTS}/{}", document.key);

    if let Some(schema_id) = document.schema_id.as_deref() {
        let schema_handle = format!("{META_SCHEMAS}/{schema_id}");
        graph
            .upsert_edge(
                USA_ESQUEMA,
                &doc_handle,
                &schema_handle,
                &edge_key(&document.key, schema_id),
                json!({}),
            )
            .await?;
    }

    if let Some(entity_key) = document.context_entity_key.as_deref() {
        let entity_handle = format!("{ENTITIES}/{entity_key}");
        graph
            .upsert_edge(
                FILE_LOCATED_IN,
                &doc_handle,
                &entity_handle,
                &edge_key(&document.key, entity_key),
                json!({}),
            )
            .await?;
    }

    if let Some(required_doc_key) = document.required_document_key.as_deref() {
        let required_doc_handle = format!("{REQUIRED_DOCUMENTS}/{required_doc_key}");
        graph
            .upsert_edge(
                COMPLIES_WITH,
                &doc_handle,
                &required_doc_handle,
                &edge_key(&document.key, required_doc_key),
                json!({}),
            )
            .await?;
    }

    Ok(document)
}
