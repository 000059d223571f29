//! Auth context resolution (spec §4.7.1): bearer token → session cache probe
//! → JWKS cryptographic fallback → local permission enrichment.

use std::sync::Arc;

use dms_graph::GraphStore;
use dms_types::edges::DMS_USERS;
use dms_types::identity::{sanitize_guid_key, DmsPermissions};
use jsonwebtoken::{decode, decode_header, Algorithm, Validation};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::error::AuthzError;
use crate::jwks::JwksCache;
use crate::session_cache::SessionCache;

/// Providers probed in order against `session:{provider}:{token_hash}`
/// (spec §4.7.1 step 2); `None` probes the unprefixed key.
const SESSION_PROVIDERS: &[Option<&str>] = &[Some("local"), Some("azure"), None];

/// Resolved caller identity and local permission snapshot (spec §4.7.1
/// step 4).
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: String,
    pub token_hash: String,
    pub token_type: String,
    pub tenant_id: Option<String>,
    pub team_ids: Vec<String>,
    pub permissions: Vec<String>,
    pub roles: Vec<String>,
}

impl AuthContext {
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Debug, Deserialize)]
struct CachedSession {
    user_id: String,
    #[serde(default = "default_token_type")]
    token_type: String,
    tenant_id: Option<String>,
    #[serde(default)]
    team_ids: Vec<String>,
    #[serde(default)]
    permissions: Vec<String>,
    #[serde(default)]
    roles: Vec<String>,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

#[derive(Debug, Deserialize)]
struct RsaClaims {
    #[serde(default)]
    oid: Option<String>,
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    tid: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
}

/// Settings needed to pick a JWKS URL and validate issuer/audience (spec
/// §4.7.1 step 3: "Azure: `…/{tenant}/discovery/v2.0/keys`; local:
/// configured URL").
pub struct JwksEndpoints<'a> {
    pub azure_tenant_id: &'a str,
    pub local_jwks_url: &'a str,
}

impl<'a> JwksEndpoints<'a> {
    fn azure_jwks_url(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/discovery/v2.0/keys",
            self.azure_tenant_id
        )
    }
}

/// Resolves a bearer token into an `AuthContext`, per spec §4.7.1.
///
/// On a cache hit, the user snapshot is re-upserted into `dms_users` in the
/// background (fire-and-forget, spec §4.7.1 step 4); on a JWKS fallback
/// (cache miss), the context is enriched from whatever local permission
/// record already exists, with no write-back.
pub async fn resolve_auth_context(
    cache: &dyn SessionCache,
    jwks: &JwksCache,
    graph: Arc<dyn GraphStore>,
    endpoints: JwksEndpoints<'_>,
    bearer_token: &str,
) -> Result<AuthContext, AuthzError> {
    if bearer_token.trim().is_empty() {
        return Err(AuthzError::MissingToken);
    }

    let token_hash = hex::encode(Sha256::digest(bearer_token.as_bytes()));

    for provider in SESSION_PROVIDERS {
        let key = match provider {
            Some(p) => format!("session:{p}:{token_hash}"),
            None => format!("session:{token_hash}"),
        };
        if let Some(value) = cache.get_json(&key).await? {
            let session: CachedSession = serde_json::from_value(value)
                .map_err(|e| AuthzError::Cache(format!("malformed cached session: {e}")))?;

            let ctx = AuthContext {
                user_id: session.user_id.clone(),
                token_hash: token_hash.clone(),
                token_type: session.token_type,
                tenant_id: session.tenant_id,
                team_ids: session.team_ids,
                permissions: session.permissions,
                roles: session.roles,
            };

            let graph = graph.clone();
            let user_id = ctx.user_id.clone();
            tokio::spawn(async move {
                if let Err(err) = touch_user_last_seen(graph.as_ref(), &user_id).await {
                    warn!(user_id, error = %err, "fire-and-forget user sync failed");
                }
            });

            return Ok(ctx);
        }
    }

    resolve_via_jwks(graph.as_ref(), jwks, endpoints, bearer_token, &token_hash).await
}

async fn resolve_via_jwks(
    graph: &dyn GraphStore,
    jwks: &JwksCache,
    endpoints: JwksEndpoints<'_>,
    bearer_token: &str,
    token_hash: &str,
) -> Result<AuthContext, AuthzError> {
    let header = decode_header(bearer_token)?;
    let kid = header.kid.ok_or_else(|| AuthzError::Jwks("token header carries no kid".to_string()))?;

    // A local-issued token has no recognizable Azure tenant claim context
    // at this point, so the only signal available pre-verification is
    // whether a local JWKS URL was configured; try it first, then Azure.
    let candidate_urls = [endpoints.local_jwks_url.to_string(), endpoints.azure_jwks_url()];

    let mut last_err = None;
    for url in candidate_urls {
        match jwks.decoding_key(&url, &kid).await {
            Ok(decoding_key) => {
                let mut validation = Validation::new(Algorithm::RS256);
                validation.validate_aud = false;
                let data = decode::<RsaClaims>(bearer_token, &decoding_key, &validation)?;
                let claims = data.claims;
                let user_id = claims
                    .oid
                    .or(claims.sub)
                    .ok_or_else(|| AuthzError::Jwks("token carries neither oid nor sub".to_string()))?;

                let (permissions, roles, team_ids) = local_permissions(graph, &user_id).await?;

                return Ok(AuthContext {
                    user_id,
                    token_hash: token_hash.to_string(),
                    token_type: claims.token_type.unwrap_or_else(default_token_type),
                    tenant_id: claims.tid,
                    team_ids,
                    permissions,
                    roles,
                });
            }
            Err(err) => last_err = Some(err),
        }
    }

    Err(last_err.unwrap_or(AuthzError::KeysUnavailable))
}

async fn local_permissions(
    graph: &dyn GraphStore,
    user_id: &str,
) -> Result<(Vec<String>, Vec<String>, Vec<String>), AuthzError> {
    let Some(key) = sanitize_guid_key(user_id) else {
        return Ok((vec![], vec![], vec![]));
    };
    let Some(doc) = graph.get_vertex(DMS_USERS, &key).await? else {
        return Ok((vec![], vec![], vec![]));
    };
    let permissions: DmsPermissions = doc
        .get("dms_permissions")
        .cloned()
        .map(serde_json::from_value)
        .transpose()
        .map_err(|e: serde_json::Error| AuthzError::Cache(e.to_string()))?
        .unwrap_or_default();

    Ok((permissions.permissions, permissions.roles, permissions.teams))
}

async fn touch_user_last_seen(graph: &dyn GraphStore, user_id: &str) -> Result<(), AuthzError> {
    let Some(key) = sanitize_guid_key(user_id) else {
        return Ok(());
    };
    if let Some(doc) = graph.get_vertex(DMS_USERS, &key).await? {
        graph.upsert_vertex(DMS_USERS, &key, doc).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use serde_json::json;

    use crate::session_cache::InMemorySessionCache;

    #[tokio::test]
    async fn cache_hit_on_local_provider_short_circuits_jwks() {
        let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
        let jwks = JwksCache::new();
        let cache = InMemorySessionCache::new();
        let token = "opaque-session-token";
        let token_hash = hex::encode(Sha256::digest(token.as_bytes()));
        cache.put_session(
            format!("session:local:{token_hash}"),
            json!({
                "user_id": "u1",
                "tenant_id": "tenant-a",
                "team_ids": ["CARR:213"],
                "permissions": ["document.read"],
                "roles": ["reviewer"],
            }),
        );

        let ctx = resolve_auth_context(
            &cache,
            &jwks,
            graph,
            JwksEndpoints {
                azure_tenant_id: "tenant-a",
                local_jwks_url: "https://auth.example.org/jwks",
            },
            token,
        )
        .await
        .unwrap();

        assert_eq!(ctx.user_id, "u1");
        assert!(ctx.has_permission("document.read"));
        assert_eq!(ctx.team_ids, vec!["CARR:213".to_string()]);
    }

    #[tokio::test]
    async fn empty_token_is_rejected() {
        let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
        let jwks = JwksCache::new();
        let cache = InMemorySessionCache::new();

        let err = resolve_auth_context(
            &cache,
            &jwks,
            graph,
            JwksEndpoints {
                azure_tenant_id: "tenant-a",
                local_jwks_url: "https://auth.example.org/jwks",
            },
            "   ",
        )
        .await
        .unwrap_err();

        assert!(matches!(err, AuthzError::MissingToken));
    }
}
