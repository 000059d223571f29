use dms_graph::GraphStore;
use dms_types::edges::DMS_USERS;
use dms_types::identity::{sanitize_guid_key, DmsPermissions, DmsUser};
use serde_json::json;
use tracing::debug;

use crate::directory::DirectoryClient;
use crate::error::IdentityError;

/// Minimum string-similarity ratio a name-only candidate must clear to be
/// accepted (spec §4.3 step 4).
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.75;

/// Resolves an OCR- or confirmation-supplied user reference to a
/// `dms_users` vertex, following spec §4.3 exactly: local cache lookup,
/// then directory exact lookup, then directory prefix search scored by
/// string similarity, upserting into the graph on any directory hit.
pub struct IdentityResolver<'a> {
    graph: &'a dyn GraphStore,
    directory: &'a dyn DirectoryClient,
}

impl<'a> IdentityResolver<'a> {
    pub fn new(graph: &'a dyn GraphStore, directory: &'a dyn DirectoryClient) -> Self {
        Self { graph, directory }
    }

    /// `resolve_user(display_name?, email?, guid_ms?) -> UserDoc | null`
    /// (spec §4.3).
    pub async fn resolve_user(
        &self,
        display_name: Option<&str>,
        email: Option<&str>,
        guid_ms: Option<&str>,
    ) -> Result<Option<DmsUser>, IdentityError> {
        // Step 1: exact lookup in the local cache by guid_ms or email.
        if let Some(user) = self.local_lookup(email, guid_ms).await? {
            return Ok(Some(user));
        }

        // Step 2: if guid_ms is present, also try the sanitized key directly
        // (covers records inserted before the email/guid_ms index existed).
        if let Some(guid) = guid_ms {
            if let Some(key) = sanitize_guid_key(guid) {
                if let Some(doc) = self.graph.get_vertex(DMS_USERS, &key).await? {
                    if let Ok(user) = serde_json::from_value::<DmsUser>(doc) {
                        return Ok(Some(user));
                    }
                }
            }
        }

        // Step 3: directory exact lookup by email or guid_ms.
        if let Some(identifier) = email.or(guid_ms) {
            if let Some(candidate) = self.directory.exact_lookup(identifier).await? {
                let user = self.upsert_from_directory(&candidate).await?;
                return Ok(Some(user));
            }
        }

        // Step 4: name-only prefix search, scored by similarity.
        if let Some(name) = display_name {
            let candidates = self.directory.prefix_search(name).await?;
            if candidates.is_empty() {
                return Ok(None);
            }

            let best = if let Some(email) = email {
                candidates
                    .iter()
                    .find(|c| c.email().map(|e| e.eq_ignore_ascii_case(email)).unwrap_or(false))
            } else {
                candidates
                    .iter()
                    .map(|c| (c, strsim::jaro_winkler(&c.display_name.to_lowercase(), &name.to_lowercase())))
                    .filter(|(_, score)| *score >= NAME_SIMILARITY_THRESHOLD)
                    .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap())
                    .map(|(c, _)| c)
            };

            if let Some(candidate) = best {
                let user = self.upsert_from_directory(candidate).await?;
                return Ok(Some(user));
            }
        }

        debug!(?display_name, ?email, "no identity candidate crossed the acceptance threshold");
        Ok(None)
    }

    async fn local_lookup(
        &self,
        email: Option<&str>,
        guid_ms: Option<&str>,
    ) -> Result<Option<DmsUser>, IdentityError> {
        if let Some(guid) = guid_ms {
            if let Some(key) = sanitize_guid_key(guid) {
                if let Some(doc) = self.graph.get_vertex(DMS_USERS, &key).await? {
                    if let Ok(user) = serde_json::from_value::<DmsUser>(doc) {
                        if user.guid_ms.as_deref() == Some(guid) {
                            return Ok(Some(user));
                        }
                    }
                }
            }
        }

        if let Some(email) = email {
            let rows = self
                .graph
                .aql_query(
                    "FOR u IN @@collection FILTER LOWER(u.email) == LOWER(@email) LIMIT 1 RETURN u",
                    json!({ "@collection": DMS_USERS, "email": email }),
                )
                .await?;
            if let Some(doc) = rows.into_iter().next() {
                if let Ok(user) = serde_json::from_value::<DmsUser>(doc) {
                    return Ok(Some(user));
                }
            }
        }

        Ok(None)
    }

    async fn upsert_from_directory(
        &self,
        candidate: &dms_types::DirectoryUser,
    ) -> Result<DmsUser, IdentityError> {
        let key = sanitize_guid_key(&candidate.id).unwrap_or_else(|| candidate.id.clone());
        let (first, rest) = split_name(&candidate.display_name);

        let document = json!({
            "guid_ms": candidate.id,
            "name": first,
            "last_name": rest,
            "email": candidate.email(),
            "status": "active",
            "source": "directory_sync",
            "dms_permissions": DmsPermissions::default(),
        });

        let saved = self.graph.upsert_vertex(DMS_USERS, &key, document).await?;
        Ok(serde_json::from_value(saved)?)
    }

    /// `create_user(display_name, email?)` (spec §4.3): inserts a brand new
    /// `dms_users` vertex with `source = "manual_validation_creation"` when
    /// confirmation-time corrections name a person absent from both the
    /// graph and the directory.
    pub async fn create_user(
        &self,
        display_name: &str,
        email: Option<&str>,
    ) -> Result<DmsUser, IdentityError> {
        let (first, rest) = split_name(display_name);
        let key = sanitize_guid_key(email.unwrap_or(display_name))
            .unwrap_or_else(|| format!("user-{}", uuid_like(display_name)));

        let document = json!({
            "name": first,
            "last_name": rest,
            "email": email,
            "status": "active",
            "source": "manual_validation_creation",
            "dms_permissions": DmsPermissions::default(),
        });

        let saved = self.graph.upsert_vertex(DMS_USERS, &key, document).await?;
        Ok(serde_json::from_value(saved)?)
    }
}

fn split_name(display_name: &str) -> (String, String) {
    let mut parts = display_name.split_whitespace();
    let first = parts.next().unwrap_or_default().to_string();
    let rest = parts.collect::<Vec<_>>().join(" ");
    (first, rest)
}

/// A deterministic fallback key fragment for `create_user` when neither an
/// email nor a sanitizable name is available; not a real UUID, just a
/// stable, collision-resistant-enough slug derived from the input.
fn uuid_like(input: &str) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    let mut hasher = DefaultHasher::new();
    input.hash(&mut hasher);
    format!("{:x}", hasher.finish())
}

impl From<serde_json::Error> for IdentityError {
    fn from(_: serde_json::Error) -> Self {
        IdentityError::Auth("failed to deserialize dms_users document".to_string())
    }
}
