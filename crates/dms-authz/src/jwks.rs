//! Process-wide JWKS cache (spec §4.7.1 step 3, §5 "JWKS cache" resource):
//! keyed by URL, TTL 3600s, refreshed under a per-URL lock with
//! double-checked re-read, serving stale keys if the refresh fetch fails.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use jsonwebtoken::DecodingKey;
use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

use crate::error::AuthzError;

const TTL: Duration = Duration::from_secs(3600);
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
struct JwksDocument {
    keys: Vec<JwkEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct JwkEntry {
    kid: String,
    n: String,
    e: String,
}

struct CachedJwks {
    keys: HashMap<String, JwkEntry>,
    fetched_at: std::time::Instant,
}

impl CachedJwks {
    fn is_fresh(&self) -> bool {
        self.fetched_at.elapsed() < TTL
    }
}

/// `url -> {keys, expires_at}` (spec §5). Reads never block a refresh in
/// flight for a *different* URL: each URL gets its own `Mutex` via
/// `refresh_locks`, acquired only on a cache miss/stale entry.
pub struct JwksCache {
    entries: RwLock<HashMap<String, CachedJwks>>,
    refresh_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    http: reqwest::Client,
}

impl Default for JwksCache {
    fn default() -> Self {
        Self::new()
    }
}

impl JwksCache {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            refresh_locks: Mutex::new(HashMap::new()),
            http: reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .build()
                .expect("reqwest client builds"),
        }
    }

    /// Returns the RS256 decoding key for `kid` at `jwks_url`, fetching or
    /// refreshing the cache entry as needed (spec §4.7.1 step 3).
    pub async fn decoding_key(&self, jwks_url: &str, kid: &str) -> Result<DecodingKey, AuthzError> {
        if let Some(key) = self.lookup_fresh(jwks_url, kid).await {
            return key;
        }

        let lock = self.refresh_lock_for(jwks_url).await;
        let _guard = lock.lock().await;

        // Double-checked: another task may have refreshed while we waited.
        if let Some(key) = self.lookup_fresh(jwks_url, kid).await {
            return key;
        }

        match self.fetch(jwks_url).await {
            Ok(document) => {
                let keys: HashMap<String, JwkEntry> =
                    document.keys.into_iter().map(|k| (k.kid.clone(), k)).collect();
                let found = keys.get(kid).map(decoding_key_from_jwk).transpose()?;
                self.entries.write().await.insert(
                    jwks_url.to_string(),
                    CachedJwks {
                        keys,
                        fetched_at: std::time::Instant::now(),
                    },
                );
                found.ok_or(AuthzError::KeysUnavailable)
            }
            Err(err) => {
                let stale = self.entries.read().await;
                if let Some(entry) = stale.get(jwks_url) {
                    warn!(jwks_url, error = %err, "jwks refresh failed, serving stale keys");
                    return entry
                        .keys
                        .get(kid)
                        .map(decoding_key_from_jwk)
                        .transpose()?
                        .ok_or(AuthzError::KeysUnavailable);
                }
                Err(AuthzError::Jwks(err.to_string()))
            }
        }
    }

    async fn lookup_fresh(&self, jwks_url: &str, kid: &str) -> Option<Result<DecodingKey, AuthzError>> {
        let entries = self.entries.read().await;
        let entry = entries.get(jwks_url)?;
        if !entry.is_fresh() {
            return None;
        }
        Some(
            entry
                .keys
                .get(kid)
                .map(decoding_key_from_jwk)
                .transpose()
                .and_then(|k| k.ok_or(AuthzError::KeysUnavailable)),
        )
    }

    async fn refresh_lock_for(&self, jwks_url: &str) -> Arc<Mutex<()>> {
        let mut locks = self.refresh_locks.lock().await;
        locks
            .entry(jwks_url.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn fetch(&self, jwks_url: &str) -> Result<JwksDocument, reqwest::Error> {
        self.http
            .get(jwks_url)
            .send()
            .await?
            .error_for_status()?
            .json::<JwksDocument>()
            .await
    }
}

fn decoding_key_from_jwk(jwk: &JwkEntry) -> Result<DecodingKey, AuthzError> {
    DecodingKey::from_rsa_components(&jwk.n, &jwk.e).map_err(AuthzError::from)
}
