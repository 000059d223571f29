use std::collections::BTreeMap;

use dms_graph::GraphStore;
use dms_identity::{DirectoryClient, IdentityResolver};
use dms_types::document::{DocumentStatus, UserRefTag, ValidatedMetadataValue};
use dms_types::schema::MetaSchema;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::message::OcrFieldResult;

/// BM25 acceptance floor for entity-field matches against
/// `entities_search_view` (spec §4.5 step 3).
pub const ENTITY_MATCH_THRESHOLD: f64 = 0.15;

/// Length ceiling for pass-through string fields (spec §4.5 step 3).
pub const PASSTHROUGH_MAX_LEN: usize = 100;

static ACADEMIC_PERIOD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b20\d{2}-[12]\b").unwrap());

pub struct ValidationOutcome {
    pub validated_metadata: BTreeMap<String, ValidatedMetadataValue>,
    pub integrity_warnings: Vec<String>,
    pub status: DocumentStatus,
}

/// Strict OCR validation against `schema` (spec §4.5 step 3): entity and
/// user fields are resolved against the graph/identity directory,
/// `academic_period` is regex-checked, everything else passes through
/// with a length ceiling.
pub async fn validate_strict(
    graph: &dyn GraphStore,
    directory: &dyn DirectoryClient,
    schema: &MetaSchema,
    ocr_metadata: &[OcrFieldResult],
) -> ValidationOutcome {
    let mut validated_metadata = BTreeMap::new();
    let mut integrity_warnings = Vec::new();
    let resolver = IdentityResolver::new(graph, directory);

    for item in ocr_metadata {
        let field = schema.field(&item.field_key);
        let label = field.map(|f| f.label.as_str()).unwrap_or(&item.field_key);

        let value = if let Some(field) = field {
            if field.is_person_field() {
                resolve_person_field(&resolver, label, &item.response, &mut integrity_warnings)
                    .await
            } else if field.is_entity_field() {
                resolve_entity_field(graph, label, &item.response, &mut integrity_warnings).await
            } else if item.field_key == "academic_period" {
                validate_academic_period(label, &item.response, &mut integrity_warnings)
            } else {
                pass_through(&item.response)
            }
        } else if item.field_key == "academic_period" {
            validate_academic_period(label, &item.response, &mut integrity_warnings)
        } else {
            pass_through(&item.response)
        };

        validated_metadata.insert(item.field_key.clone(), value);
    }

    let any_invalid = validated_metadata
        .values()
        .any(|v| !v.is_valid());
    let status = if any_invalid || !integrity_warnings.is_empty() {
        DocumentStatus::AttentionRequired
    } else {
        DocumentStatus::Validated
    };

    ValidationOutcome {
        validated_metadata,
        integrity_warnings,
        status,
    }
}

async fn resolve_entity_field(
    graph: &dyn GraphStore,
    label: &str,
    response: &str,
    warnings: &mut Vec<String>,
) -> ValidatedMetadataValue {
    let matches = graph
        .search_view(
            "entities_search_view",
            &["name", "code"],
            response,
            1,
        )
        .await
        .unwrap_or_default();

    match matches.into_iter().next() {
        Some(top) if top.score >= ENTITY_MATCH_THRESHOLD => {
            let doc = top.document;
            let name = doc.get("name").and_then(|v| v.as_str()).unwrap_or(response);
            ValidatedMetadataValue::EntityRef {
                id: doc.get("_key").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
                name: Some(name.to_string()),
                code: doc.get("code").and_then(|v| v.as_str()).map(String::from),
                entity_type: doc.get("type").and_then(|v| v.as_str()).map(String::from),
                value: name.to_string(),
            }
        }
        _ => no_match(label, response, warnings),
    }
}

async fn resolve_person_field(
    resolver: &IdentityResolver<'_>,
    label: &str,
    response: &str,
    warnings: &mut Vec<String>,
) -> ValidatedMetadataValue {
    match resolver.resolve_user(Some(response), None, None).await {
        Ok(Some(user)) => {
            let display_name = format!("{} {}", user.name, user.last_name)
                .trim()
                .to_string();
            ValidatedMetadataValue::UserRef {
                id: user.key,
                display_name: display_name.clone(),
                email: user.email,
                kind: UserRefTag::User,
                value: display_name,
            }
        }
        _ => no_match(label, response, warnings),
    }
}

fn no_match(
    label: &str,
    response: &str,
    warnings: &mut Vec<String>,
) -> ValidatedMetadataValue {
    warnings.push(format!("Campo '{label}' no coincide con registros."));
    ValidatedMetadataValue::Wrapper {
        value: serde_json::Value::String(response.to_string()),
        is_valid: false,
        source: "ocr_raw".to_string(),
        message: Some(format!("Campo '{label}' no coincide con registros.")),
    }
}

fn validate_academic_period(
    label: &str,
    response: &str,
    warnings: &mut Vec<String>,
) -> ValidatedMetadataValue {
    if ACADEMIC_PERIOD_PATTERN.is_match(response) {
        ValidatedMetadataValue::Wrapper {
            value: serde_json::Value::String(response.to_string()),
            is_valid: true,
            source: "regex_match".to_string(),
            message: None,
        }
    } else {
        let message = format!("Campo '{label}' no coincide con el formato esperado.");
        warnings.push(message.clone());
        ValidatedMetadataValue::Wrapper {
            value: serde_json::Value::String(response.to_string()),
            is_valid: false,
            source: "ocr_raw".to_string(),
            message: Some(message),
        }
    }
}

fn pass_through(response: &str) -> ValidatedMetadataValue {
    ValidatedMetadataValue::Wrapper {
        value: serde_json::Value::String(response.to_string()),
        is_valid: response.len() <= PASSTHROUGH_MAX_LEN,
        source: "ocr_raw".to_string(),
        message: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use dms_identity::InMemoryDirectoryClient;
    use dms_types::schema::{DataType, EntityTypeKey, EntityTypeKeyField, SchemaField};
    use serde_json::json;

    fn schema_with_entity_field() -> MetaSchema {
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
                entity_type: Some(EntityTypeKeyField {
                    key: EntityTypeKey::Career,
                }),
            }],
        }
    }

    #[tokio::test]
    async fn accepts_entity_match_above_threshold() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                "entities",
                "cs",
                json!({ "name": "Computer Science", "code": "CS", "type": "carrera" }),
            )
            .await
            .unwrap();
        let directory = InMemoryDirectoryClient { users: vec![] };
        let schema = schema_with_entity_field();

        let outcome = validate_strict(
            &graph,
            &directory,
            &schema,
            &[OcrFieldResult {
                field_key: "career".to_string(),
                response: "Computer Science".to_string(),
            }],
        )
        .await;

        assert_eq!(outcome.status, DocumentStatus::Validated);
        assert!(outcome.integrity_warnings.is_empty());
    }

    #[tokio::test]
    async fn flags_unmatched_entity_field_as_attention_required() {
        let graph = InMemoryGraphStore::new();
        let directory = InMemoryDirectoryClient { users: vec![] };
        let schema = schema_with_entity_field();

        let outcome = validate_strict(
            &graph,
            &directory,
            &schema,
            &[OcrFieldResult {
                field_key: "career".to_string(),
                response: "Nonexistent Program".to_string(),
            }],
        )
        .await;

        assert_eq!(outcome.status, DocumentStatus::AttentionRequired);
        assert_eq!(outcome.integrity_warnings.len(), 1);
    }

    #[test]
    fn academic_period_regex_accepts_expected_shape() {
        let mut warnings = vec![];
        let value = validate_academic_period("Periodo", "2024-1", &mut warnings);
        assert!(value.is_valid());
        assert!(warnings.is_empty());
    }

    #[test]
    fn academic_period_regex_rejects_bad_shape() {
        let mut warnings = vec![];
        let value = validate_academic_period("Periodo", "2024-3", &mut warnings);
        assert!(!value.is_valid());
        assert_eq!(warnings.len(), 1);
    }
}
