use serde::{Deserialize, Serialize};

/// Organizational node type (spec §3.1). `(type, code)` is unique within a
/// tenant; new variants must be added here rather than represented as loose
/// strings so that naming/ABAC resolution stays exhaustive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Sede,
    Facultad,
    Carrera,
    Departamento,
    #[serde(other)]
    Other,
}

impl EntityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::Sede => "sede",
            EntityType::Facultad => "facultad",
            EntityType::Carrera => "carrera",
            EntityType::Departamento => "departamento",
            EntityType::Other => "other",
        }
    }
}

/// An `entities` vertex: an organizational node (spec §3.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub code: Option<String>,
    pub code_numeric: Option<String>,
}

/// A catalog vertex shared by `subsystems`, `process_categories`, and
/// `processes` (spec §3.1) — these three collections carry identical fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogNode {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    pub code: Option<String>,
}

/// A `required_documents` vertex: names the schema that governs it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequiredDocument {
    #[serde(rename = "_key")]
    pub key: String,
    pub name: String,
    pub code: Option<String>,
    pub schema_id: Option<String>,
}

/// The `{id, name, code}` descriptor of a required document as it arrives on
/// an OCR message (spec §6.1) or is embedded in a document's context
/// snapshot (spec §3.1 `context_snapshot`).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RequiredDocumentRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub code: Option<String>,
}

/// A lightweight `{id, name, type}` reference to an `entities` vertex, used
/// both in API responses (joined `context_entity`) and in the OCR message's
/// `document_data.external_document.files[0].metadataValues`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRef {
    pub id: String,
    pub name: String,
    #[serde(default = "default_entity_ref_type")]
    pub r#type: String,
    pub code: Option<String>,
}

fn default_entity_ref_type() -> String {
    "unknown".to_string()
}

/// `{id, name, version}` — the schema as joined into a document detail
/// response (spec §6.2 `used_schema`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRef {
    pub id: String,
    pub name: String,
    pub version: Option<i64>,
}
