//! Integrity manifest construction and verification (spec §4.6.2 step 6,
//! §4.6.3): HMAC-SHA256 over canonical JSON.

use chrono::{DateTime, Utc};
use dms_objectstore::bucket::ObjectBucket;
use dms_types::document::ValidatedMetadataValue;
use dms_types::storage::{IntegrityHashes, IntegrityManifest, IntegrityRecord, IntegrityVerification};
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::error::ConfirmError;

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_ALGORITHM: &str = "HMAC-SHA256";

/// Serializes `value` with sorted keys and no insignificant whitespace.
/// `serde_json::Map` in this workspace is `BTreeMap`-backed (the
/// `preserve_order` feature is never enabled), so a plain `to_string` is
/// already canonical.
fn canonical_json<T: Serialize>(value: &T) -> Result<String, ConfirmError> {
    Ok(serde_json::to_string(value)?)
}

fn sign(secret: &[u8], payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

fn verify_signature(secret: &[u8], payload: &str, signature_hex: &str) -> bool {
    let Ok(expected) = hex::decode(signature_hex) else {
        return false;
    };
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload.as_bytes());
    mac.verify_slice(&expected).is_ok()
}

async fn hash_storage_object(bucket: &ObjectBucket, path: &str) -> Result<String, ConfirmError> {
    let bytes = bucket.get_bytes(path).await?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Builds and signs the integrity manifest for a just-confirmed document
/// (spec §4.6.2 step 6).
pub async fn build_integrity_manifest(
    bucket: &ObjectBucket,
    secret: &[u8],
    doc_id: &str,
    validated_metadata: &BTreeMap<String, ValidatedMetadataValue>,
    confirmed_by: &str,
    confirmed_at: DateTime<Utc>,
    keep_original: bool,
    selected_pdf_path: Option<&str>,
) -> Result<IntegrityRecord, ConfirmError> {
    let metadata_json = canonical_json(validated_metadata)?;
    let validated_metadata_sha256 = hex::encode(Sha256::digest(metadata_json.as_bytes()));

    let pdf_sha256 = match selected_pdf_path {
        Some(path) => Some(hash_storage_object(bucket, path).await?),
        None => None,
    };

    let manifest = IntegrityManifest {
        doc_id: doc_id.to_string(),
        confirmed_by: confirmed_by.to_string(),
        confirmed_at,
        keep_original,
        selected_pdf_path: selected_pdf_path.map(str::to_string),
        hashes: IntegrityHashes { validated_metadata_sha256, pdf_sha256 },
        signature_algorithm: SIGNATURE_ALGORITHM.to_string(),
    };

    let manifest_payload = canonical_json(&manifest)?;
    let manifest_signature = sign(secret, &manifest_payload);

    Ok(IntegrityRecord { manifest: Some(manifest), manifest_signature: Some(manifest_signature) })
}

/// Recomputes both hashes and the HMAC signature and compares them against
/// the stored manifest (spec §4.6.3).
pub async fn verify_integrity(
    bucket: &ObjectBucket,
    secret: &[u8],
    validated_metadata: &BTreeMap<String, ValidatedMetadataValue>,
    integrity: &IntegrityRecord,
) -> Result<IntegrityVerification, ConfirmError> {
    let Some(manifest) = &integrity.manifest else {
        return Ok(IntegrityVerification {
            is_valid: false,
            signature_valid: false,
            metadata_hash_valid: false,
            pdf_hash_valid: false,
            selected_pdf_path: None,
            message: "no integrity manifest recorded for this document".to_string(),
        });
    };

    let manifest_payload = canonical_json(manifest)?;
    let signature_valid = integrity
        .manifest_signature
        .as_deref()
        .map(|sig| verify_signature(secret, &manifest_payload, sig))
        .unwrap_or(false);

    let metadata_json = canonical_json(validated_metadata)?;
    let recomputed_metadata_sha256 = hex::encode(Sha256::digest(metadata_json.as_bytes()));
    let metadata_hash_valid = recomputed_metadata_sha256 == manifest.hashes.validated_metadata_sha256;

    let pdf_hash_valid = match (&manifest.selected_pdf_path, &manifest.hashes.pdf_sha256) {
        (Some(path), Some(expected)) => match hash_storage_object(bucket, path).await {
            Ok(actual) => &actual == expected,
            Err(_) => false,
        },
        (None, None) => true,
        _ => false,
    };

    let is_valid = signature_valid && metadata_hash_valid && pdf_hash_valid;
    let message = if is_valid {
        "integrity verified".to_string()
    } else {
        "integrity check failed".to_string()
    };

    Ok(IntegrityVerification {
        is_valid,
        signature_valid,
        metadata_hash_valid,
        pdf_hash_valid,
        selected_pdf_path: manifest.selected_pdf_path.clone(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_metadata() -> BTreeMap<String, ValidatedMetadataValue> {
        let mut m = BTreeMap::new();
        m.insert("career".to_string(), ValidatedMetadataValue::Scalar(serde_json::json!("Computer Science")));
        m
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let secret = b"top-secret";
        let payload = r#"{"a":1}"#;
        let signature = sign(secret, payload);
        assert!(verify_signature(secret, payload, &signature));
    }

    #[test]
    fn verify_rejects_tampered_payload() {
        let secret = b"top-secret";
        let signature = sign(secret, r#"{"a":1}"#);
        assert!(!verify_signature(secret, r#"{"a":2}"#, &signature));
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let signature = sign(b"secret-one", r#"{"a":1}"#);
        assert!(!verify_signature(b"secret-two", r#"{"a":1}"#, &signature));
    }

    #[tokio::test]
    async fn build_then_verify_manifest_round_trip() {
        let bucket = ObjectBucket::in_memory("dms");
        bucket.upload(bytes::Bytes::from_static(b"pdf-bytes"), "archive/x/T1/principal.pdf").await.unwrap();

        let secret = b"integrity-secret";
        let metadata = sample_metadata();
        let confirmed_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();

        let record = build_integrity_manifest(
            &bucket,
            secret,
            "doc-1",
            &metadata,
            "user-1",
            confirmed_at,
            false,
            Some("archive/x/T1/principal.pdf"),
        )
        .await
        .unwrap();

        let verification = verify_integrity(&bucket, secret, &metadata, &record).await.unwrap();
        assert!(verification.is_valid);
        assert!(verification.signature_valid);
        assert!(verification.metadata_hash_valid);
        assert!(verification.pdf_hash_valid);
    }

    #[tokio::test]
    async fn verify_detects_metadata_drift() {
        let bucket = ObjectBucket::in_memory("dms");
        bucket.upload(bytes::Bytes::from_static(b"pdf-bytes"), "archive/x/T1/principal.pdf").await.unwrap();

        let secret = b"integrity-secret";
        let confirmed_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let record = build_integrity_manifest(
            &bucket,
            secret,
            "doc-1",
            &sample_metadata(),
            "user-1",
            confirmed_at,
            false,
            Some("archive/x/T1/principal.pdf"),
        )
        .await
        .unwrap();

        let mut drifted = sample_metadata();
        drifted.insert("career".to_string(), ValidatedMetadataValue::Scalar(serde_json::json!("Biology")));

        let verification = verify_integrity(&bucket, secret, &drifted, &record).await.unwrap();
        assert!(!verification.is_valid);
        assert!(!verification.metadata_hash_valid);
        assert!(verification.signature_valid);
    }

    #[tokio::test]
    async fn verify_with_no_manifest_reports_invalid() {
        let bucket = ObjectBucket::in_memory("dms");
        let empty = IntegrityRecord::default();
        let verification = verify_integrity(&bucket, b"secret", &sample_metadata(), &empty).await.unwrap();
        assert!(!verification.is_valid);
        assert_eq!(verification.message, "no integrity manifest recorded for this document");
    }
}
