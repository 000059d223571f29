use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The OCR topic's wire shape (spec §6.1), deserialized verbatim before
/// the parse step (§4.5 step 1) turns it into [`crate::parse::ParsedIngest`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrMessage {
    pub task_id: Option<String>,
    pub user_id: Option<String>,
    pub timestamp: Option<chrono::DateTime<chrono::Utc>>,
    pub document_data: DocumentData,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DocumentData {
    pub internal_result: InternalResult,
    pub external_document: ExternalDocument,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InternalResult {
    pub filename: String,
    pub processing_time: f64,
    pub metadata: Vec<OcrFieldResult>,
    pub presigned_urls: PresignedUrls,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OcrFieldResult {
    #[serde(rename = "fieldKey")]
    pub field_key: String,
    pub response: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PresignedUrls {
    pub minio_pdfa: Option<String>,
    pub minio_validated: Option<String>,
    pub minio_text: Option<String>,
    pub minio_original_pdf: Option<String>,
}

impl PresignedUrls {
    /// Iterates `(artifact_key, url)` pairs in a stable order, matching
    /// the storage-key naming used by the transfer step (spec §4.5 step
    /// 2: `{minio_pdfa, minio_validated, minio_text, minio_original_pdf}`).
    pub fn entries(&self) -> Vec<(&'static str, Option<&str>)> {
        vec![
            ("pdf", self.minio_pdfa.as_deref()),
            ("json", self.minio_validated.as_deref()),
            ("text", self.minio_text.as_deref()),
            ("pdf_original_path", self.minio_original_pdf.as_deref()),
        ]
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalDocument {
    pub user: ExternalUser,
    pub files: Vec<ExternalFile>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalUser {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExternalFile {
    #[serde(rename = "metadataValues")]
    pub metadata_values: ContextValues,
    #[serde(rename = "metadataSchema")]
    pub metadata_schema: SchemaInfo,
    #[serde(rename = "requiredDocumentId")]
    pub required_document_id: Option<String>,
    #[serde(rename = "requiredDocumentName")]
    pub required_document_name: Option<String>,
    #[serde(rename = "requiredDocumentCode")]
    pub required_document_code: Option<String>,
}

/// `document_data.external_document.files[0].metadataValues`: the entity
/// the file was uploaded under (spec §6.1's `{id, name, type}`).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ContextValues {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SchemaInfo {
    pub id: String,
    pub name: String,
}

/// Convenience accessor used by the parse step: every OCR field keyed by
/// `field_key` for O(1) lookup against the schema.
pub fn metadata_by_field_key(metadata: &[OcrFieldResult]) -> HashMap<&str, &str> {
    metadata
        .iter()
        .map(|m| (m.field_key.as_str(), m.response.as_str()))
        .collect()
}
