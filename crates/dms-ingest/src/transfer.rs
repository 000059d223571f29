use dms_objectstore::{paths, ObjectBucket};

use crate::parse::ParsedIngest;

/// Storage paths produced by the transfer step, `None` for any artifact
/// whose presigned URL was absent or failed to transfer (spec §4.5 step
/// 2: "per-file failure logs and stores `null` for that key; it does not
/// abort the pipeline").
#[derive(Debug, Clone, Default)]
pub struct TransferredArtifacts {
    pub pdf_path: Option<String>,
    pub pdf_original_path: Option<String>,
    pub json_path: Option<String>,
    pub text_path: Option<String>,
}

/// Downloads each presigned URL in `parsed.presigned_urls` and re-uploads
/// it under `stage-validate/<user_id>/<task_id>/<key>_document.<ext>`
/// (spec §4.5 step 2, §4.2 layout).
pub async fn transfer(bucket: &ObjectBucket, parsed: &ParsedIngest) -> TransferredArtifacts {
    let mut artifacts = TransferredArtifacts::default();

    for (key, url) in parsed.presigned_urls.entries() {
        let Some(url) = url else { continue };
        let ext = extension_for_key(key);
        let path = paths::stage_path(&parsed.user_id, &parsed.task_id, key, ext);
        let storage_path = bucket.transfer_presigned(url, &path).await;

        match key {
            "pdf" => artifacts.pdf_path = storage_path,
            "pdf_original_path" => artifacts.pdf_original_path = storage_path,
            "json" => artifacts.json_path = storage_path,
            "text" => artifacts.text_path = storage_path,
            _ => {}
        }
    }

    artifacts
}

fn extension_for_key(key: &str) -> &'static str {
    match key {
        "pdf" | "pdf_original_path" => "pdf",
        "json" => "json",
        "text" => "txt",
        _ => "bin",
    }
}
