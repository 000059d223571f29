//! Supplementary browsing helpers carried back from `original_source/`
//! (SPEC_FULL §4 items 1-2): the metadata filter catalog for a required
//! document's governing schema, and the distinct set of entities that
//! have at least one document located in them.

use dms_graph::{Direction, GraphStore};
use dms_types::edges::{ENTITIES, META_SCHEMAS, REQUIRED_DOCUMENTS, USA_ESQUEMA};
use dms_types::{EntityRef, MetaSchema, MetadataFilterOption, RequiredDocument};

use crate::error::SearchError;

/// `GET /documents/{doc_id}/metadata/filters` (SPEC_FULL §4 item 1):
/// resolves `required_document_id`'s governing schema — preferring the
/// `usa_esquema` edge, falling back to the vertex's own `schema_id`
/// attribute — and returns its fields as filter descriptors, sorted by
/// `sort_order`.
pub async fn metadata_filter_catalog(
    graph: &dyn GraphStore,
    required_document_id: &str,
) -> Result<Vec<MetadataFilterOption>, SearchError> {
    let required_doc_raw = graph
        .get_vertex(REQUIRED_DOCUMENTS, required_document_id)
        .await?
        .ok_or_else(|| SearchError::DocumentNotFound(required_document_id.to_string()))?;
    let required_doc: RequiredDocument = serde_json::from_value(required_doc_raw)?;

    let schema_key = schema_key_for_required_document(graph, required_document_id, &required_doc).await?;
    let Some(schema_key) = schema_key else {
        return Ok(Vec::new());
    };

    let Some(schema_raw) = graph.get_vertex(META_SCHEMAS, &schema_key).await? else {
        return Ok(Vec::new());
    };
    let schema: MetaSchema = serde_json::from_value(schema_raw)?;

    let mut options: Vec<MetadataFilterOption> = schema
        .fields
        .iter()
        .map(|field| MetadataFilterOption {
            key: field.field_key.clone(),
            label: field.label.clone(),
            data_type: Some(field.data_type),
            input_type: field.type_input.as_ref().map(|t| t.key),
            entity_type: field.entity_type.as_ref().map(|e| e.key),
            required: field.is_required,
            sort_order: field.sort_order,
        })
        .collect();
    options.sort_by_key(|o| o.sort_order);
    Ok(options)
}

async fn schema_key_for_required_document(
    graph: &dyn GraphStore,
    required_document_id: &str,
    required_doc: &RequiredDocument,
) -> Result<Option<String>, SearchError> {
    let handle = format!("{REQUIRED_DOCUMENTS}/{required_document_id}");
    let via_edge = graph
        .traverse(&handle, 1, 1, Direction::Outbound, &[USA_ESQUEMA])
        .await?
        .into_iter()
        .find_map(|v| v.get("_key").and_then(|k| k.as_str()).map(String::from));

    Ok(via_edge.or_else(|| required_doc.schema_id.clone()))
}

/// `get_entities_with_docs` (SPEC_FULL §4 item 2): distinct entities
/// reachable as the `file_located_in` target of at least one document,
/// used to populate search facets.
pub async fn entities_with_documents(graph: &dyn GraphStore) -> Result<Vec<EntityRef>, SearchError> {
    let rows = graph
        .aql_query(
            &format!(
                "FOR doc IN documents\n  FOR e IN 1..1 OUTBOUND doc file_located_in\n  RETURN DISTINCT {{ _key: e._key, name: e.name, type: e.type, code: e.code }}"
            ),
            serde_json::json!({ "@collection": ENTITIES }),
        )
        .await?;

    let refs = rows
        .into_iter()
        .filter_map(|row| {
            let id = row.get("_key")?.as_str()?.to_string();
            let name = row.get("name")?.as_str()?.to_string();
            let r#type = row.get("type").and_then(|v| v.as_str()).unwrap_or("unknown").to_string();
            let code = row.get("code").and_then(|v| v.as_str()).map(String::from);
            Some(EntityRef { id, name, r#type, code })
        })
        .collect();
    Ok(refs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use dms_types::edges::{edge_key, DOCUMENTS};
    use dms_types::schema::{DataType, SchemaField};
    use serde_json::json;

    #[tokio::test]
    async fn catalog_resolves_schema_via_edge_over_attribute() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                REQUIRED_DOCUMENTS,
                "rd-1",
                json!({ "name": "Transcript", "code": "TRN", "schema_id": "ignored" }),
            )
            .await
            .unwrap();
        graph
            .upsert_vertex(
                META_SCHEMAS,
                "schema-1",
                serde_json::to_value(MetaSchema {
                    key: "schema-1".to_string(),
                    name: "Admission".to_string(),
                    version: 1,
                    fields: vec![
                        SchemaField {
                            field_key: "b".to_string(),
                            label: "B".to_string(),
                            data_type: DataType::String,
                            is_required: false,
                            sort_order: 2,
                            type_input: None,
                            entity_type: None,
                        },
                        SchemaField {
                            field_key: "a".to_string(),
                            label: "A".to_string(),
                            data_type: DataType::String,
                            is_required: true,
                            sort_order: 1,
                            type_input: None,
                            entity_type: None,
                        },
                    ],
                })
                .unwrap(),
            )
            .await
            .unwrap();
        graph
            .upsert_edge(
                USA_ESQUEMA,
                "required_documents/rd-1",
                "meta_schemas/schema-1",
                &edge_key("rd-1", "schema-1"),
                json!({}),
            )
            .await
            .unwrap();

        let options = metadata_filter_catalog(&graph, "rd-1").await.unwrap();
        assert_eq!(options.len(), 2);
        assert_eq!(options[0].key, "a");
        assert_eq!(options[1].key, "b");
    }

    #[tokio::test]
    async fn catalog_falls_back_to_schema_id_attribute_without_edge() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                REQUIRED_DOCUMENTS,
                "rd-2",
                json!({ "name": "Transcript", "code": "TRN", "schema_id": "schema-2" }),
            )
            .await
            .unwrap();
        graph
            .upsert_vertex(
                META_SCHEMAS,
                "schema-2",
                serde_json::to_value(MetaSchema {
                    key: "schema-2".to_string(),
                    name: "Admission".to_string(),
                    version: 1,
                    fields: vec![],
                })
                .unwrap(),
            )
            .await
            .unwrap();

        let options = metadata_filter_catalog(&graph, "rd-2").await.unwrap();
        assert!(options.is_empty());
    }

    #[tokio::test]
    async fn unknown_required_document_is_not_found() {
        let graph = InMemoryGraphStore::new();
        let err = metadata_filter_catalog(&graph, "missing").await.unwrap_err();
        assert!(matches!(err, SearchError::DocumentNotFound(_)));
    }

    #[tokio::test]
    async fn entities_with_documents_query_shape_is_well_formed() {
        // InMemoryGraphStore's aql_query fake ignores the query text and
        // just returns every seeded vertex; this exercises the call
        // plumbing without asserting AQL semantics (covered by query.rs's
        // pure composition tests elsewhere in this crate).
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(DOCUMENTS, "T1", json!({ "status": "validated" }))
            .await
            .unwrap();
        let refs = entities_with_documents(&graph).await.unwrap();
        assert!(refs.is_empty());
    }
}
