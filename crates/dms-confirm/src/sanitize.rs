//! Entity existence enforcement and metadata sanitization (spec §4.6.2
//! steps 4-5).

use dms_graph::GraphStore;
use dms_types::document::{UserRefTag, ValidatedMetadataValue};
use dms_types::edges::{DMS_USERS, ENTITIES};
use dms_types::schema::{MetaSchema, SchemaField};
use dms_identity::IdentityResolver;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::error::ConfirmError;

/// Confirms every schema field's proposed value resolves to a real entity
/// before anything is persisted (spec §4.6.2 step 4). User fields may be
/// silently created through the identity resolver; non-user fields are
/// never invented — a missing or unknown id rejects the whole request.
pub async fn ensure_entities_exist(
    graph: &dyn GraphStore,
    resolver: &IdentityResolver<'_>,
    schema: &MetaSchema,
    metadata: &Map<String, Value>,
) -> Result<(), ConfirmError> {
    for field in &schema.fields {
        let Some(Value::Object(dict)) = metadata.get(&field.field_key) else {
            continue;
        };

        let id = dict.get("id").and_then(|v| v.as_str());
        let display_name = dict
            .get("display_name")
            .or_else(|| dict.get("name"))
            .and_then(|v| v.as_str());
        let email = dict.get("email").and_then(|v| v.as_str());

        if field.is_person_field() {
            ensure_user_exists(graph, resolver, field, id, display_name, email).await?;
        } else if field.is_entity_field() {
            ensure_structural_entity_exists(graph, field, id).await?;
        }
    }
    Ok(())
}

async fn ensure_user_exists(
    graph: &dyn GraphStore,
    resolver: &IdentityResolver<'_>,
    field: &SchemaField,
    id: Option<&str>,
    display_name: Option<&str>,
    email: Option<&str>,
) -> Result<(), ConfirmError> {
    if let Some(id) = id {
        if graph.has_vertex(DMS_USERS, id).await? {
            return Ok(());
        }
    }

    if resolver.resolve_user(display_name, email, id).await?.is_some() {
        return Ok(());
    }

    match display_name {
        Some(name) if !name.trim().is_empty() => {
            resolver.create_user(name, email).await?;
            Ok(())
        }
        _ => Err(ConfirmError::MissingEntityId(field.field_key.clone())),
    }
}

async fn ensure_structural_entity_exists(
    graph: &dyn GraphStore,
    field: &SchemaField,
    id: Option<&str>,
) -> Result<(), ConfirmError> {
    match id {
        Some(id) if graph.has_vertex(ENTITIES, id).await? => Ok(()),
        Some(id) => Err(ConfirmError::UnknownEntity(field.field_key.clone(), id.to_string())),
        None => Err(ConfirmError::MissingEntityId(field.field_key.clone())),
    }
}

/// Drops any metadata key outside the schema's allowed set and reduces
/// every remaining value to its clean domain shape (spec §4.6.2 step 5,
/// §3.2).
pub fn sanitize_metadata(
    schema: &MetaSchema,
    metadata: &Map<String, Value>,
) -> BTreeMap<String, ValidatedMetadataValue> {
    let mut out = BTreeMap::new();
    for field in &schema.fields {
        let Some(raw) = metadata.get(&field.field_key) else {
            continue;
        };
        if let Some(value) = sanitize_value(field, raw) {
            out.insert(field.field_key.clone(), value);
        }
    }
    out
}

fn sanitize_value(field: &SchemaField, raw: &Value) -> Option<ValidatedMetadataValue> {
    match raw {
        Value::Null => None,
        Value::Object(map) if is_primitive_wrapper(map) => sanitize_wrapper(map),
        Value::Object(map) => Some(filter_entity_fields(field, map)),
        other => Some(ValidatedMetadataValue::Scalar(other.clone())),
    }
}

/// True for the OCR primitive wrapper shape (`{value, is_valid, source}`,
/// spec §3.2) resubmitted unchanged at confirm time, as opposed to a
/// genuine entity/user payload object (`{id, name, code, ...}`).
fn is_primitive_wrapper(map: &Map<String, Value>) -> bool {
    map.contains_key("value") && map.contains_key("is_valid")
}

/// Unwraps `{value, is_valid, source, message}` per spec §4.6.2 step 5 /
/// §3.2: an invalid wrapper drops to `null` (the key is omitted
/// entirely), a valid one passes its bare `value` through unwrapped.
fn sanitize_wrapper(map: &Map<String, Value>) -> Option<ValidatedMetadataValue> {
    let is_valid = map.get("is_valid").and_then(Value::as_bool).unwrap_or(false);
    if !is_valid {
        return None;
    }
    match map.get("value") {
        Some(Value::Null) | None => None,
        Some(value) => Some(ValidatedMetadataValue::Scalar(value.clone())),
    }
}

/// Reduces a raw `{id, display_name, name, code, email, ...}` wrapper
/// object to the clean domain shape, computing `value` as the first
/// non-empty of `display_name, name, code, email, id` (spec §4.6.2 step 5).
fn filter_entity_fields(field: &SchemaField, map: &Map<String, Value>) -> ValidatedMetadataValue {
    let id = map.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string();
    let display_name = map.get("display_name").and_then(|v| v.as_str()).map(String::from);
    let name = map.get("name").and_then(|v| v.as_str()).map(String::from);
    let code = map.get("code").and_then(|v| v.as_str()).map(String::from);
    let email = map.get("email").and_then(|v| v.as_str()).map(String::from);

    let value = display_name
        .clone()
        .or_else(|| name.clone())
        .or_else(|| code.clone())
        .or_else(|| email.clone())
        .unwrap_or_else(|| id.clone());

    if field.is_person_field() {
        ValidatedMetadataValue::UserRef {
            id,
            display_name: display_name.or(name).unwrap_or_default(),
            email,
            kind: UserRefTag::User,
            value,
        }
    } else {
        let entity_type = map.get("type").and_then(|v| v.as_str()).map(String::from);
        ValidatedMetadataValue::EntityRef {
            id,
            name: name.or(display_name),
            code,
            entity_type,
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_identity::InMemoryDirectoryClient;
    use dms_graph::InMemoryGraphStore;
    use dms_types::schema::DataType;
    use serde_json::json;

    fn user_field() -> SchemaField {
        SchemaField {
            field_key: "responsible".to_string(),
            label: "Responsable".to_string(),
            data_type: DataType::Json,
            is_required: false,
            sort_order: 1,
            type_input: None,
            entity_type: Some(dms_types::schema::EntityTypeKeyField {
                key: dms_types::schema::EntityTypeKey::User,
            }),
        }
    }

    fn entity_field() -> SchemaField {
        SchemaField {
            field_key: "career".to_string(),
            label: "Carrera".to_string(),
            data_type: DataType::Json,
            is_required: false,
            sort_order: 1,
            type_input: None,
            entity_type: Some(dms_types::schema::EntityTypeKeyField {
                key: dms_types::schema::EntityTypeKey::Career,
            }),
        }
    }

    fn schema() -> MetaSchema {
        MetaSchema {
            key: "schema-1".to_string(),
            name: "Admission".to_string(),
            version: 1,
            fields: vec![user_field(), entity_field()],
        }
    }

    #[tokio::test]
    async fn missing_structural_entity_id_is_rejected_not_invented() {
        let graph = InMemoryGraphStore::new();
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);

        let mut metadata = Map::new();
        metadata.insert("career".to_string(), json!({ "name": "Computer Science" }));

        let err = ensure_entities_exist(&graph, &resolver, &schema(), &metadata)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::MissingEntityId(ref f) if f == "career"));
    }

    #[tokio::test]
    async fn unknown_structural_entity_id_is_rejected() {
        let graph = InMemoryGraphStore::new();
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);

        let mut metadata = Map::new();
        metadata.insert("career".to_string(), json!({ "id": "missing-key" }));

        let err = ensure_entities_exist(&graph, &resolver, &schema(), &metadata)
            .await
            .unwrap_err();
        assert!(matches!(err, ConfirmError::UnknownEntity(..)));
    }

    #[tokio::test]
    async fn user_field_with_no_match_and_a_name_creates_silently() {
        let graph = InMemoryGraphStore::new();
        let directory = InMemoryDirectoryClient { users: vec![] };
        let resolver = IdentityResolver::new(&graph, &directory);

        let mut metadata = Map::new();
        metadata.insert("responsible".to_string(), json!({ "display_name": "Juan Perez" }));

        ensure_entities_exist(&graph, &resolver, &schema(), &metadata)
            .await
            .unwrap();
    }

    #[test]
    fn sanitize_strips_unknown_keys_and_computes_value() {
        let mut metadata = Map::new();
        metadata.insert(
            "career".to_string(),
            json!({ "id": "cs", "name": "Computer Science", "type": "carrera", "ui_hint": "ignored" }),
        );
        metadata.insert("unrelated_key".to_string(), json!("drop me"));

        let sanitized = sanitize_metadata(&schema(), &metadata);
        assert_eq!(sanitized.len(), 1);
        match &sanitized["career"] {
            ValidatedMetadataValue::EntityRef { value, id, .. } => {
                assert_eq!(value, "Computer Science");
                assert_eq!(id, "cs");
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn null_value_is_dropped() {
        let mut metadata = Map::new();
        metadata.insert("career".to_string(), Value::Null);
        let sanitized = sanitize_metadata(&schema(), &metadata);
        assert!(sanitized.is_empty());
    }

    #[test]
    fn invalid_primitive_wrapper_becomes_null() {
        let mut metadata = Map::new();
        metadata.insert(
            "career".to_string(),
            json!({ "value": "2024-1", "is_valid": false, "source": "ocr_raw" }),
        );
        let sanitized = sanitize_metadata(&schema(), &metadata);
        assert!(!sanitized.contains_key("career"));
    }

    #[test]
    fn valid_primitive_wrapper_passes_through_bare_scalar() {
        let mut metadata = Map::new();
        metadata.insert(
            "career".to_string(),
            json!({ "value": "2024-1", "is_valid": true, "source": "regex_match" }),
        );
        let sanitized = sanitize_metadata(&schema(), &metadata);
        match &sanitized["career"] {
            ValidatedMetadataValue::Scalar(value) => assert_eq!(value, "2024-1"),
            other => panic!("unexpected shape: {other:?}"),
        }
    }
}
