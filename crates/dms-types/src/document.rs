use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::naming::NamingRecord;
use crate::storage::{IntegrityRecord, StorageRecord};

/// `documents.status` (spec §3.1, state machine in §4.7.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Validated,
    AttentionRequired,
    Confirmed,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStatus::Validated => "validated",
            DocumentStatus::AttentionRequired => "attention_required",
            DocumentStatus::Confirmed => "confirmed",
        }
    }

    /// The default status parameter for search (spec §4.7.4).
    pub fn default_query_status() -> Self {
        DocumentStatus::AttentionRequired
    }

    /// Statuses that gate behind the approve/reject scope union rather
    /// than plain `document.read` (spec §4.7.4).
    pub fn is_sensitive(&self) -> bool {
        matches!(self, DocumentStatus::AttentionRequired)
    }

    /// Same check over the raw query-string value, for callers that only
    /// have the unparsed `status` parameter (spec §4.7.4).
    pub fn is_sensitive_str(status: &str) -> bool {
        status == DocumentStatus::AttentionRequired.as_str()
    }
}

/// `documents.owner` (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

/// One entry of `validated_metadata` (spec §3.2). The wire shape is
/// discriminated structurally, not by an explicit tag, because the OCR
/// pipeline and the original Python service both produce untagged JSON
/// objects; `#[serde(untagged)]` mirrors that without resurrecting the
/// duck-typed "looks like a user" string-key heuristic in our own code
/// (spec §9) — the variants below are the only shapes ever produced.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ValidatedMetadataValue {
    /// Post-sanitization user reference. Tried before `EntityRef` since
    /// both share `id`/`value`; `deny_unknown_fields` on each makes the
    /// match unambiguous regardless of order, but checking the more
    /// specific shape first keeps intent obvious to a reader.
    #[serde(deny_unknown_fields)]
    UserRef {
        id: String,
        display_name: String,
        email: Option<String>,
        #[serde(rename = "type")]
        kind: UserRefTag,
        value: String,
    },
    /// Post-sanitization entity reference.
    #[serde(deny_unknown_fields)]
    EntityRef {
        id: String,
        name: Option<String>,
        code: Option<String>,
        #[serde(rename = "type")]
        entity_type: Option<String>,
        value: String,
    },
    /// Pre-confirmation OCR wrapper: `{ value, is_valid, source }`, with an
    /// optional `message` warning (spec §3.2, §4.5 step 3).
    #[serde(deny_unknown_fields)]
    Wrapper {
        value: serde_json::Value,
        is_valid: bool,
        source: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        message: Option<String>,
    },
    /// A bare scalar, used transiently while building metadata before
    /// sanitization assigns it a `value` field.
    Scalar(serde_json::Value),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRefTag {
    User,
}

impl ValidatedMetadataValue {
    /// The representative searchable string for this value (spec §3.2:
    /// "prefers `display_name`/`name`/`code`/`email`").
    pub fn searchable_value(&self) -> Option<&str> {
        match self {
            ValidatedMetadataValue::EntityRef { value, .. } => Some(value),
            ValidatedMetadataValue::UserRef { value, .. } => Some(value),
            ValidatedMetadataValue::Wrapper { value, .. } => value.as_str(),
            ValidatedMetadataValue::Scalar(v) => v.as_str(),
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            ValidatedMetadataValue::Wrapper { is_valid, .. } => *is_valid,
            _ => true,
        }
    }
}

/// Snapshot of entity/schema/required-doc names captured at ingest time
/// (spec §3.1 `context_snapshot`), used by archive promotion (spec §4.6.2
/// step 3) to build the archival prefix without re-traversing the graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub entity_name: Option<String>,
    pub entity_type: Option<String>,
    pub process_code: Option<String>,
    pub process_name: Option<String>,
    pub required_doc_code: Option<String>,
    pub required_doc_name: Option<String>,
}

/// A `documents` vertex (spec §3.1) — the central artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "_key")]
    pub key: String,
    pub owner: Owner,
    pub status: DocumentStatus,
    pub original_filename: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub confirmed_by: Option<String>,
    pub manually_validated_at: Option<DateTime<Utc>>,
    pub is_public: bool,
    pub keep_original: bool,
    pub is_locked: bool,
    pub display_name: Option<String>,
    pub snap_context_name: Option<String>,
    pub naming: NamingRecord,
    pub storage: StorageRecord,
    pub validated_metadata: BTreeMap<String, ValidatedMetadataValue>,
    #[serde(default)]
    pub integrity_warnings: Vec<String>,
    #[serde(default)]
    pub context_snapshot: ContextSnapshot,
    #[serde(default)]
    pub integrity: IntegrityRecord,
    /// The context entity this document was uploaded under; not persisted
    /// on the vertex itself (it lives on the `file_located_in` edge) but
    /// threaded through the ingestion/confirmation pipelines in memory.
    #[serde(skip)]
    pub context_entity_key: Option<String>,
    #[serde(skip)]
    pub schema_id: Option<String>,
    #[serde(skip)]
    pub required_document_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapper_roundtrips() {
        let v = ValidatedMetadataValue::Wrapper {
            value: serde_json::Value::String("Juan Perez".into()),
            is_valid: false,
            source: "ocr_raw".into(),
            message: Some("no match".into()),
        };
        let json = serde_json::to_value(&v).unwrap();
        let back: ValidatedMetadataValue = serde_json::from_value(json).unwrap();
        assert_eq!(v, back);
    }

    #[test]
    fn entity_ref_roundtrips_and_prefers_explicit_value() {
        let v = ValidatedMetadataValue::EntityRef {
            id: "e9".into(),
            name: Some("Tecnologías de la Información".into()),
            code: Some("TDI".into()),
            entity_type: Some("carrera".into()),
            value: "Tecnologías de la Información".into(),
        };
        assert_eq!(v.searchable_value(), Some("Tecnologías de la Información"));
        let json = serde_json::to_value(&v).unwrap();
        let back: ValidatedMetadataValue = serde_json::from_value(json).unwrap();
        assert_eq!(v, back);
    }
}
