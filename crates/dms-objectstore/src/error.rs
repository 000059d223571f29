#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("object store request failed: {0}")]
    Backend(#[from] object_store::Error),

    #[error("presigned url transfer failed: {0}")]
    Transfer(#[from] reqwest::Error),
}
