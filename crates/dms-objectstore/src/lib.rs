//! Bucket-scoped object storage: put/get/copy/remove, streaming reads,
//! presigned-URL transfer, and the path/slug conventions for the one
//! shared bucket (the "Object Store Adapter" component, spec §4.2).

pub mod bucket;
pub mod error;
pub mod paths;

pub use bucket::ObjectBucket;
pub use error::StoreError;

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn upload_then_get_bytes_roundtrips() {
        let bucket = ObjectBucket::in_memory("dms-test");
        let path = paths::stage_path("u1", "t1", "pdf", "pdf");
        let storage_path = bucket.upload(Bytes::from_static(b"%PDF-1.4"), &path).await.unwrap();
        assert_eq!(storage_path, format!("dms-test/{path}"));

        let bytes = bucket.get_bytes(&storage_path).await.unwrap();
        assert_eq!(bytes.as_ref(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn copy_then_remove_source_leaves_only_destination() {
        let bucket = ObjectBucket::in_memory("dms-test");
        let src = "stage-validate/u1/t1/pdf_document.pdf";
        bucket.upload(Bytes::from_static(b"data"), src).await.unwrap();

        let dst = "archive/eng/cs/admission/transcript/t1/principal.pdf";
        bucket.copy(src, dst).await.unwrap();
        bucket.remove(src).await.unwrap();

        assert!(!bucket.exists(src).await.unwrap());
        assert!(bucket.exists(dst).await.unwrap());
    }
}
