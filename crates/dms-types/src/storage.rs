use serde::{Deserialize, Serialize};

/// Where a document's artifacts live in the object store (spec §3.1, §4.2).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageRecord {
    pub pdf_path: Option<String>,
    pub pdf_original_path: Option<String>,
    pub json_path: Option<String>,
    pub text_path: Option<String>,
    /// Optional presigned URL computed on demand; never persisted as a
    /// long-lived value.
    pub pdf_signed_url: Option<String>,
    pub archive_prefix: Option<String>,
    /// `"stage"` until archive promotion, `"archive"` after (spec §4.6.2
    /// step 3).
    pub storage_tier: Option<String>,
    /// `"ocr_pdfa"` or `"original"` (spec §4.6.2 step 2).
    pub primary_source: Option<String>,
    pub pdfa_conversion_required: Option<bool>,
    pub pdfa_conversion_status: Option<String>,
}

/// `documents.integrity.manifest` (spec §4.6.2 step 6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityHashes {
    pub validated_metadata_sha256: String,
    pub pdf_sha256: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityManifest {
    pub doc_id: String,
    pub confirmed_by: String,
    pub confirmed_at: chrono::DateTime<chrono::Utc>,
    pub keep_original: bool,
    pub selected_pdf_path: Option<String>,
    pub hashes: IntegrityHashes,
    pub signature_algorithm: String,
}

/// `documents.integrity` (spec §3.1): absent until the document is
/// confirmed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IntegrityRecord {
    pub manifest: Option<IntegrityManifest>,
    pub manifest_signature: Option<String>,
}

/// Result of re-running the integrity check against current state (spec
/// §4.6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityVerification {
    pub is_valid: bool,
    pub signature_valid: bool,
    pub metadata_hash_valid: bool,
    pub pdf_hash_valid: bool,
    pub selected_pdf_path: Option<String>,
    pub message: String,
}
