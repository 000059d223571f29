use dms_types::RequiredDocumentRef;

use crate::error::IngestError;
use crate::message::{ContextValues, ExternalUser, OcrFieldResult, OcrMessage, PresignedUrls, SchemaInfo};

/// The typed, fully-parsed form of an OCR message (spec §4.5 step 1). No
/// partial parsing: anything that can't be resolved here is a fatal error
/// raised before any side effect runs.
#[derive(Debug, Clone)]
pub struct ParsedIngest {
    pub task_id: String,
    pub user_id: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub filename: String,
    pub processing_time: f64,
    pub ocr_metadata: Vec<OcrFieldResult>,
    pub presigned_urls: PresignedUrls,
    pub context_values: ContextValues,
    pub schema_info: SchemaInfo,
    pub user_snapshot: ExternalUser,
    pub required_document: RequiredDocumentRef,
}

/// Copies `message` into a [`ParsedIngest`] (spec §4.5 step 1). Fatal
/// when `task_id` or the file descriptor carrying context/schema
/// information is absent — there is nothing meaningful to validate or
/// store without them.
pub fn parse(message: OcrMessage) -> Result<ParsedIngest, IngestError> {
    let task_id = message
        .task_id
        .ok_or_else(|| IngestError::Parse("missing task_id".to_string()))?;

    let file = message
        .document_data
        .external_document
        .files
        .into_iter()
        .next()
        .ok_or_else(|| IngestError::Parse("missing external_document.files[0]".to_string()))?;

    Ok(ParsedIngest {
        task_id,
        user_id: message
            .user_id
            .unwrap_or_else(|| message.document_data.external_document.user.id.clone()),
        timestamp: message.timestamp.unwrap_or_else(chrono::Utc::now),
        filename: message.document_data.internal_result.filename,
        processing_time: message.document_data.internal_result.processing_time,
        ocr_metadata: message.document_data.internal_result.metadata,
        presigned_urls: message.document_data.internal_result.presigned_urls,
        context_values: file.metadata_values,
        schema_info: file.metadata_schema,
        user_snapshot: message.document_data.external_document.user,
        required_document: RequiredDocumentRef {
            id: file.required_document_id,
            name: file.required_document_name,
            code: file.required_document_code,
        },
    })
}
