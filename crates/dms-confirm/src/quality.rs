//! Quality-check dry run (spec §4.6.1): a read-only preview of what
//! confirmation would accept, scored per schema field.

use dms_graph::GraphStore;
use dms_types::edges::{DMS_USERS, ENTITIES, META_SCHEMAS, USA_ESQUEMA};
use dms_types::schema::{DataType, MetaSchema, SchemaField};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

use crate::error::ConfirmError;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@]+@[^@]+\.[^@]+$").unwrap());

/// One row of the quality-check report (spec §4.6.1 step 2).
#[derive(Debug, Clone)]
pub struct FieldReport {
    pub key: String,
    pub label: String,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub actions: Vec<String>,
}

/// The quality-check response shape (spec §4.6.1).
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub score: f64,
    pub is_ready: bool,
    pub fields_report: Vec<FieldReport>,
    pub summary_warnings: Vec<String>,
}

/// Resolves the `meta_schemas` vertex linked to a document through its
/// `usa_esquema` edge. The document's own `_key` is filtered out of the
/// traversal result so this works whether the store returns the start
/// vertex inline (the in-memory fake) or only the neighbor (Arango).
pub async fn schema_for_document(
    graph: &dyn GraphStore,
    doc_key: &str,
) -> Result<Option<MetaSchema>, ConfirmError> {
    let doc_handle = format!("documents/{doc_key}");
    let chain = graph
        .traverse(&doc_handle, 1, 1, dms_graph::Direction::Outbound, &[USA_ESQUEMA])
        .await?;

    let schema_doc = chain
        .into_iter()
        .find(|v| v.get("_key").and_then(|k| k.as_str()) != Some(doc_key));

    Ok(schema_doc.map(serde_json::from_value).transpose()?)
}

/// `dry_run_validation(doc_id, metadata)` (spec §4.6.1): no schema means an
/// automatic `{score: 100, is_ready: true}` pass; otherwise every field is
/// weighted (required = 2, optional = 1) and scored.
pub async fn dry_run_validation(
    graph: &dyn GraphStore,
    doc_key: &str,
    metadata: &Map<String, Value>,
) -> Result<ValidationReport, ConfirmError> {
    let Some(schema) = schema_for_document(graph, doc_key).await? else {
        return Ok(ValidationReport {
            score: 100.0,
            is_ready: true,
            fields_report: vec![],
            summary_warnings: vec!["Sin esquema definido".to_string()],
        });
    };

    let mut earned = 0.0;
    let mut total = 0.0;
    let mut fields_report = Vec::with_capacity(schema.fields.len());

    for field in &schema.fields {
        let weight = if field.is_required { 2.0 } else { 1.0 };
        total += weight;

        let mut warnings = Vec::new();
        let mut actions = Vec::new();
        let value = metadata.get(&field.field_key);
        let is_valid = validate_field(graph, field, value, &mut warnings, &mut actions).await;
        if is_valid {
            earned += weight;
        }

        fields_report.push(FieldReport {
            key: field.field_key.clone(),
            label: field.label.clone(),
            is_valid,
            warnings,
            actions,
        });
    }

    let score = if total > 0.0 { 100.0 * earned / total } else { 100.0 };
    let is_ready = fields_report.iter().all(|f| f.is_valid);

    Ok(ValidationReport {
        score,
        is_ready,
        fields_report,
        summary_warnings: vec![],
    })
}

fn is_empty_value(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        _ => false,
    }
}

async fn validate_field(
    graph: &dyn GraphStore,
    field: &SchemaField,
    value: Option<&Value>,
    warnings: &mut Vec<String>,
    actions: &mut Vec<String>,
) -> bool {
    if field.is_required && is_empty_value(value) {
        warnings.push("Campo obligatorio vacío.".to_string());
        return false;
    }
    if is_empty_value(value) {
        return true;
    }
    let value = value.expect("checked non-empty above");

    match field.data_type {
        DataType::Email => match value.as_str() {
            Some(s) if EMAIL_PATTERN.is_match(s) => true,
            _ => {
                warnings.push(format!("Campo '{}' no tiene un formato de correo válido.", field.label));
                false
            }
        },
        DataType::Date => match value.as_str().and_then(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()) {
            Some(_) => true,
            None => {
                warnings.push(format!(
                    "Campo '{}' no tiene el formato de fecha esperado (YYYY-MM-DD).",
                    field.label
                ));
                false
            }
        },
        DataType::Json => match value {
            Value::Object(map) => validate_entity_object(graph, field, map, warnings, actions).await,
            _ if field.entity_type.is_some() => {
                warnings.push(format!("Campo '{}' debe ser un objeto.", field.label));
                false
            }
            _ => true,
        },
        DataType::String | DataType::Number => true,
    }
}

/// Existence check for a json-object field (spec §4.6.1 step 2 "json
/// (object)"): users against `dms_users`, structural entities against
/// `entities`. Only user fields can ever produce a `CREATE_USER` action —
/// structural entities never get invented here, matching the stricter rule
/// confirmation itself enforces (spec §4.6.2 step 4).
async fn validate_entity_object(
    graph: &dyn GraphStore,
    field: &SchemaField,
    value_dict: &Map<String, Value>,
    warnings: &mut Vec<String>,
    actions: &mut Vec<String>,
) -> bool {
    let id = value_dict.get("id").and_then(|v| v.as_str());
    let has_name = value_dict
        .get("display_name")
        .or_else(|| value_dict.get("name"))
        .and_then(|v| v.as_str())
        .map(|s| !s.trim().is_empty())
        .unwrap_or(false);

    if field.is_person_field() {
        match id {
            Some(id) => match graph.has_vertex(DMS_USERS, id).await {
                Ok(true) => true,
                Ok(false) if has_name => {
                    actions.push("CREATE_USER".to_string());
                    true
                }
                _ => {
                    warnings.push(format!("El usuario referenciado en '{}' no existe.", field.label));
                    false
                }
            },
            None if has_name => {
                actions.push("CREATE_USER".to_string());
                true
            }
            None => {
                warnings.push(format!("Campo '{}' requiere un identificador o nombre.", field.label));
                false
            }
        }
    } else {
        match id {
            Some(id) => match graph.has_vertex(ENTITIES, id).await {
                Ok(true) => true,
                _ => {
                    warnings.push(format!("La entidad referenciada en '{}' no existe.", field.label));
                    false
                }
            },
            None => {
                warnings.push(format!("Campo '{}' requiere un identificador.", field.label));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use dms_types::schema::{EntityTypeKey, EntityTypeKeyField, TypeInputKey, TypeInputKeyField};
    use serde_json::json;

    fn schema_with_one_required_field() -> MetaSchema {
        MetaSchema {
            key: "schema-1".to_string(),
            name: "Admission".to_string(),
            version: 1,
            fields: vec![SchemaField {
                field_key: "career".to_string(),
                label: "Carrera".to_string(),
                data_type: DataType::String,
                is_required: true,
                sort_order: 1,
                type_input: None,
                entity_type: None,
            }],
        }
    }

    #[tokio::test]
    async fn no_schema_returns_full_score_and_sin_esquema_warning() {
        let graph = InMemoryGraphStore::new();
        let report = dry_run_validation(&graph, "doc-1", &Map::new()).await.unwrap();
        assert_eq!(report.score, 100.0);
        assert!(report.is_ready);
        assert_eq!(report.summary_warnings, vec!["Sin esquema definido".to_string()]);
    }

    #[tokio::test]
    async fn required_empty_field_is_invalid_with_warning() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex("documents", "doc-1", json!({}))
            .await
            .unwrap();
        graph
            .upsert_vertex(META_SCHEMAS, "schema-1", serde_json::to_value(schema_with_one_required_field()).unwrap())
            .await
            .unwrap();
        graph
            .upsert_edge(USA_ESQUEMA, "documents/doc-1", "meta_schemas/schema-1", "doc-1_schema-1", json!({}))
            .await
            .unwrap();

        let mut metadata = Map::new();
        metadata.insert("career".to_string(), Value::String("".to_string()));

        let report = dry_run_validation(&graph, "doc-1", &metadata).await.unwrap();
        assert_eq!(report.score, 0.0);
        assert!(!report.is_ready);
        assert_eq!(report.fields_report[0].warnings, vec!["Campo obligatorio vacío.".to_string()]);
    }

    #[tokio::test]
    async fn email_field_rejects_malformed_address() {
        let mut schema = schema_with_one_required_field();
        schema.fields[0].data_type = DataType::Email;
        schema.fields[0].is_required = false;

        let graph = InMemoryGraphStore::new();
        let mut metadata = Map::new();
        metadata.insert("career".to_string(), Value::String("not-an-email".to_string()));

        let mut warnings = vec![];
        let mut actions = vec![];
        let is_valid = validate_field(
            &graph,
            &schema.fields[0],
            metadata.get("career"),
            &mut warnings,
            &mut actions,
        )
        .await;
        assert!(!is_valid);
        assert_eq!(warnings.len(), 1);
    }

    #[tokio::test]
    async fn missing_user_with_display_name_yields_create_user_action() {
        let graph = InMemoryGraphStore::new();
        let field = SchemaField {
            field_key: "responsible".to_string(),
            label: "Responsable".to_string(),
            data_type: DataType::Json,
            is_required: false,
            sort_order: 1,
            type_input: Some(TypeInputKeyField { key: TypeInputKey::User }),
            entity_type: Some(EntityTypeKeyField { key: EntityTypeKey::User }),
        };

        let value = json!({ "display_name": "Juan Perez" });
        let mut warnings = vec![];
        let mut actions = vec![];
        let is_valid = validate_field(&graph, &field, Some(&value), &mut warnings, &mut actions).await;

        assert!(is_valid);
        assert_eq!(actions, vec!["CREATE_USER".to_string()]);
    }

    #[tokio::test]
    async fn missing_structural_entity_is_invalid_and_never_creates() {
        let graph = InMemoryGraphStore::new();
        let field = SchemaField {
            field_key: "career".to_string(),
            label: "Carrera".to_string(),
            data_type: DataType::Json,
            is_required: false,
            sort_order: 1,
            type_input: Some(TypeInputKeyField { key: TypeInputKey::Career }),
            entity_type: Some(EntityTypeKeyField { key: EntityTypeKey::Career }),
        };

        let value = json!({ "id": "nonexistent" });
        let mut warnings = vec![];
        let mut actions = vec![];
        let is_valid = validate_field(&graph, &field, Some(&value), &mut warnings, &mut actions).await;

        assert!(!is_valid);
        assert!(actions.is_empty());
    }
}
