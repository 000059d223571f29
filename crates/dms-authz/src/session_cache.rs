//! The external KV seam (spec §4.7.1, §4.7.2): session lookups and
//! permission-set membership checks. `RedisSessionCache` is the production
//! implementation (spec §6.3 `AUTH_REDIS_URL`); `InMemorySessionCache` is the
//! test fake, mirroring how `dms-graph`/`dms-identity` isolate their own
//! network seams.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde_json::Value;

use crate::error::AuthzError;

/// Session + permission-set lookups against the shared KV store (spec
/// §4.7.1 step 2, §4.7.2 primary path). A single shared connection created
/// once under a lazy initializer, per spec §5's "KV client" resource.
#[async_trait]
pub trait SessionCache: Send + Sync {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, AuthzError>;

    async fn sismember(&self, set_key: &str, member: &str) -> Result<bool, AuthzError>;
}

pub struct RedisSessionCache {
    manager: redis::aio::ConnectionManager,
}

impl RedisSessionCache {
    pub async fn connect(redis_url: &str) -> Result<Self, AuthzError> {
        let client = redis::Client::open(redis_url).map_err(|e| AuthzError::Cache(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| AuthzError::Cache(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl SessionCache for RedisSessionCache {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, AuthzError> {
        let mut conn = self.manager.clone();
        let raw: Option<String> = conn.get(key).await.map_err(|e| AuthzError::Cache(e.to_string()))?;
        match raw {
            Some(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| AuthzError::Cache(e.to_string())),
            None => Ok(None),
        }
    }

    async fn sismember(&self, set_key: &str, member: &str) -> Result<bool, AuthzError> {
        let mut conn = self.manager.clone();
        conn.sismember(set_key, member)
            .await
            .map_err(|e| AuthzError::Cache(e.to_string()))
    }
}

/// In-memory fake for tests: plain maps behind a `Mutex`, no TTL semantics
/// (none of the callers under test rely on expiry).
#[derive(Default)]
pub struct InMemorySessionCache {
    sessions: Mutex<HashMap<String, Value>>,
    sets: Mutex<HashMap<String, HashSet<String>>>,
}

impl InMemorySessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put_session(&self, key: impl Into<String>, value: Value) {
        self.sessions.lock().unwrap().insert(key.into(), value);
    }

    pub fn add_to_set(&self, set_key: impl Into<String>, member: impl Into<String>) {
        self.sets
            .lock()
            .unwrap()
            .entry(set_key.into())
            .or_default()
            .insert(member.into());
    }
}

#[async_trait]
impl SessionCache for InMemorySessionCache {
    async fn get_json(&self, key: &str) -> Result<Option<Value>, AuthzError> {
        Ok(self.sessions.lock().unwrap().get(key).cloned())
    }

    async fn sismember(&self, set_key: &str, member: &str) -> Result<bool, AuthzError> {
        Ok(self
            .sets
            .lock()
            .unwrap()
            .get(set_key)
            .map(|s| s.contains(member))
            .unwrap_or(false))
    }
}
