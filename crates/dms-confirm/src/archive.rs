//! Archive prefix derivation and stage-to-archive promotion (spec §4.6.2
//! step 3).

use std::collections::HashSet;

use dms_objectstore::bucket::ObjectBucket;
use dms_objectstore::paths;
use dms_types::naming::NamingRecord;
use dms_types::storage::StorageRecord;

use crate::error::ConfirmError;

/// Builds the archive prefix for a document, deriving the path segments
/// from its naming record's `code_path` and stripping a trailing segment
/// that merely repeats the required document's own slug (e.g. a
/// `code_path` that already ends in "Transcript" when the required
/// document is itself "Transcript").
pub fn build_archive_prefix(
    naming: &NamingRecord,
    process_name: Option<&str>,
    required_doc_name: Option<&str>,
    task_id: &str,
) -> String {
    let process_name = process_name.filter(|s| !s.trim().is_empty()).unwrap_or("sin-proceso");
    let required_doc_name = required_doc_name.filter(|s| !s.trim().is_empty()).unwrap_or("sin-documento");

    let mut segments: Vec<&str> = naming
        .code_path
        .split(" / ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        segments.push("general");
    }

    if let Some(last) = segments.last() {
        if paths::slug(last) == paths::slug(required_doc_name) {
            segments.pop();
        }
    }
    if segments.is_empty() {
        segments.push("general");
    }

    paths::archive_prefix(&segments, process_name, required_doc_name, task_id)
}

fn is_staged(path: &str) -> bool {
    path.starts_with("stage-validate/") || path.starts_with("stage/")
}

/// Copies every staged artifact into the archive prefix and removes the
/// staging copies, deduplicating sources that back more than one artifact
/// slot (e.g. `pdf_path` and `pdf_original_path` pointing at the same
/// upload). A no-op when nothing is currently staged.
pub async fn promote_from_stage(
    bucket: &ObjectBucket,
    storage: &mut StorageRecord,
    archive_prefix: &str,
) -> Result<(), ConfirmError> {
    let currently_staged = [&storage.pdf_path, &storage.pdf_original_path, &storage.json_path, &storage.text_path]
        .into_iter()
        .flatten()
        .any(|p| is_staged(p));
    if !currently_staged {
        return Ok(());
    }

    let mut staged_sources: HashSet<String> = HashSet::new();

    storage.pdf_path = archive_one(bucket, &storage.pdf_path, archive_prefix, "principal.pdf", &mut staged_sources).await?;
    storage.pdf_original_path =
        archive_one(bucket, &storage.pdf_original_path, archive_prefix, "original.pdf", &mut staged_sources).await?;
    storage.json_path = archive_one(bucket, &storage.json_path, archive_prefix, "metadata.json", &mut staged_sources).await?;
    storage.text_path = archive_one(bucket, &storage.text_path, archive_prefix, "extracted.txt", &mut staged_sources).await?;

    storage.archive_prefix = Some(archive_prefix.to_string());
    storage.storage_tier = Some("archive".to_string());
    Ok(())
}

async fn archive_one(
    bucket: &ObjectBucket,
    source: &Option<String>,
    archive_prefix: &str,
    artifact: &str,
    staged_sources: &mut HashSet<String>,
) -> Result<Option<String>, ConfirmError> {
    let Some(source) = source else {
        return Ok(None);
    };
    if !is_staged(source) {
        return Ok(Some(source.clone()));
    }

    let dest = paths::archive_path(archive_prefix, artifact);
    bucket.copy(source, &dest).await?;
    if staged_sources.insert(source.clone()) {
        bucket.remove(source).await?;
    }
    Ok(Some(dest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn naming(code_path: &str) -> NamingRecord {
        NamingRecord {
            name_path: "Facultad / Admisiones".to_string(),
            code_path: code_path.to_string(),
            code_numeric_path: "01/02".to_string(),
            name_code: "FAC-ADM".to_string(),
            name_code_numeric: "01-02".to_string(),
            display_name: "Facultad - Admisiones".to_string(),
            timestamp_tag: "20260101".to_string(),
            required_document_code: None,
            path_nodes: vec![],
        }
    }

    #[test]
    fn strips_trailing_segment_matching_required_document_slug() {
        let prefix = build_archive_prefix(&naming("Facultad / Transcript"), Some("Admission"), Some("Transcript"), "T1");
        assert_eq!(prefix, "archive/facultad/admission/transcript/T1");
    }

    #[test]
    fn keeps_segments_when_none_match_required_document() {
        let prefix = build_archive_prefix(&naming("Facultad / Admisiones"), Some("Admission"), Some("Transcript"), "T1");
        assert_eq!(prefix, "archive/facultad/admisiones/admission/transcript/T1");
    }

    #[test]
    fn falls_back_to_general_when_code_path_is_empty() {
        let prefix = build_archive_prefix(&naming(""), Some("Admission"), Some("Transcript"), "T1");
        assert_eq!(prefix, "archive/general/admission/transcript/T1");
    }

    #[tokio::test]
    async fn promote_from_stage_is_noop_without_staged_paths() {
        let bucket = ObjectBucket::in_memory("dms");
        let mut storage = StorageRecord {
            pdf_path: Some("archive/already/here/principal.pdf".to_string()),
            ..Default::default()
        };
        promote_from_stage(&bucket, &mut storage, "archive/x/y/T1").await.unwrap();
        assert_eq!(storage.storage_tier, None);
    }

    #[tokio::test]
    async fn promote_from_stage_copies_and_removes_deduped_sources() {
        let bucket = ObjectBucket::in_memory("dms");
        bucket.upload(bytes::Bytes::from_static(b"pdf-bytes"), "stage-validate/u1/T1/pdf_document.pdf").await.unwrap();

        let mut storage = StorageRecord {
            pdf_path: Some("stage-validate/u1/T1/pdf_document.pdf".to_string()),
            pdf_original_path: Some("stage-validate/u1/T1/pdf_document.pdf".to_string()),
            ..Default::default()
        };

        promote_from_stage(&bucket, &mut storage, "archive/fac/adm/T1").await.unwrap();

        assert_eq!(storage.pdf_path.as_deref(), Some("archive/fac/adm/T1/principal.pdf"));
        assert_eq!(storage.pdf_original_path.as_deref(), Some("archive/fac/adm/T1/original.pdf"));
        assert_eq!(storage.storage_tier.as_deref(), Some("archive"));
        assert!(!bucket.exists("stage-validate/u1/T1/pdf_document.pdf").await.unwrap());
        assert!(bucket.exists("archive/fac/adm/T1/principal.pdf").await.unwrap());
    }
}
