use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dms_config::AzureSettings;
use dms_types::DirectoryUser;

use crate::error::IdentityError;

/// The external identity directory (spec §4.3 steps 3-4): an exact lookup
/// by email/GUID and a prefix search over the common name fields. The
/// real implementation talks to Microsoft Graph; tests use an in-memory
/// fake, the way `dms-graph` keeps `ArangoStore` behind `GraphStore`.
#[async_trait]
pub trait DirectoryClient: Send + Sync {
    async fn exact_lookup(&self, email_or_guid: &str) -> Result<Option<DirectoryUser>, IdentityError>;

    async fn prefix_search(&self, query: &str) -> Result<Vec<DirectoryUser>, IdentityError>;
}

/// Microsoft Graph-backed directory client using the client-credentials
/// flow, grounded in the teacher's own Azure token-exchange idiom
/// (`iam-auth::providers::azure`) but adapted from JWT-bearer federation
/// to a plain `client_credentials` grant, since this crate is resolving
/// identities inbound rather than minting outbound cloud credentials.
pub struct AzureDirectoryClient {
    client: reqwest::Client,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    cached_token: Mutex<Option<(String, Instant)>>,
}

#[derive(serde::Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(serde::Deserialize)]
struct GraphUsersResponse {
    value: Vec<GraphUser>,
}

#[derive(serde::Deserialize)]
struct GraphUser {
    id: String,
    #[serde(rename = "displayName")]
    display_name: Option<String>,
    #[serde(rename = "givenName")]
    given_name: Option<String>,
    surname: Option<String>,
    mail: Option<String>,
    #[serde(rename = "userPrincipalName")]
    user_principal_name: Option<String>,
}

impl From<GraphUser> for DirectoryUser {
    fn from(u: GraphUser) -> Self {
        DirectoryUser {
            id: u.id,
            display_name: u.display_name.unwrap_or_default(),
            given_name: u.given_name,
            surname: u.surname,
            mail: u.mail,
            user_principal_name: u.user_principal_name,
        }
    }
}

impl AzureDirectoryClient {
    pub fn new(settings: &AzureSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            tenant_id: settings.tenant_id.clone(),
            client_id: settings.client_id.clone(),
            client_secret: settings.client_secret.clone(),
            cached_token: Mutex::new(None),
        }
    }

    async fn access_token(&self) -> Result<String, IdentityError> {
        if let Some((token, expires_at)) = self.cached_token.lock().unwrap().clone() {
            if expires_at > Instant::now() {
                return Ok(token);
            }
        }

        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", "https://graph.microsoft.com/.default"),
        ];

        let response = self
            .client
            .post(format!(
                "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
                self.tenant_id
            ))
            .form(&params)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| IdentityError::Auth(e.to_string()))?;

        let body: TokenResponse = response.json().await?;
        let expires_at = Instant::now() + Duration::from_secs(body.expires_in.saturating_sub(60));
        *self.cached_token.lock().unwrap() = Some((body.access_token.clone(), expires_at));
        Ok(body.access_token)
    }

    async fn graph_get(&self, url: &str) -> Result<GraphUsersResponse, IdentityError> {
        let token = self.access_token().await?;
        let response = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()
            .await?
            .error_for_status()
            .map_err(|e| IdentityError::Auth(e.to_string()))?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl DirectoryClient for AzureDirectoryClient {
    async fn exact_lookup(&self, email_or_guid: &str) -> Result<Option<DirectoryUser>, IdentityError> {
        let filter = format!(
            "mail eq '{email_or_guid}' or userPrincipalName eq '{email_or_guid}' or id eq '{email_or_guid}'"
        );
        let url = format!(
            "https://graph.microsoft.com/v1.0/users?$filter={}",
            urlencoding_minimal(&filter)
        );
        let body = self.graph_get(&url).await?;
        Ok(body.value.into_iter().next().map(Into::into))
    }

    async fn prefix_search(&self, query: &str) -> Result<Vec<DirectoryUser>, IdentityError> {
        let filter = format!(
            "startswith(displayName,'{query}') or startswith(givenName,'{query}') or \
             startswith(surname,'{query}') or startswith(mail,'{query}') or \
             startswith(userPrincipalName,'{query}')"
        );
        let url = format!(
            "https://graph.microsoft.com/v1.0/users?$filter={}",
            urlencoding_minimal(&filter)
        );
        let body = self.graph_get(&url).await?;
        Ok(body.value.into_iter().map(Into::into).collect())
    }
}

/// Minimal query-string escaping sufficient for Graph `$filter` values;
/// avoids pulling in a second URL-encoding crate beyond the `url` crate
/// already in the workspace, which doesn't expose a standalone percent
/// encoder for arbitrary fragments.
fn urlencoding_minimal(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// In-memory fake used by this crate's tests and by other crates that
/// exercise [`crate::resolver::IdentityResolver`] in their own tests
/// (e.g. `dms-ingest`'s strict validation step), mirroring how
/// `dms-graph` exports `InMemoryGraphStore` unconditionally rather than
/// gating it behind `#[cfg(test)]`.
pub struct InMemoryDirectoryClient {
    pub users: Vec<DirectoryUser>,
}

#[async_trait]
impl DirectoryClient for InMemoryDirectoryClient {
    async fn exact_lookup(&self, email_or_guid: &str) -> Result<Option<DirectoryUser>, IdentityError> {
        let needle = email_or_guid.to_lowercase();
        Ok(self
            .users
            .iter()
            .find(|u| {
                u.id.to_lowercase() == needle
                    || u.email().map(|e| e.to_lowercase()) == Some(needle.clone())
            })
            .cloned())
    }

    async fn prefix_search(&self, query: &str) -> Result<Vec<DirectoryUser>, IdentityError> {
        let needle = query.to_lowercase();
        Ok(self
            .users
            .iter()
            .filter(|u| {
                u.display_name.to_lowercase().starts_with(&needle)
                    || u.given_name
                        .as_deref()
                        .map(|s| s.to_lowercase().starts_with(&needle))
                        .unwrap_or(false)
                    || u.surname
                        .as_deref()
                        .map(|s| s.to_lowercase().starts_with(&needle))
                        .unwrap_or(false)
                    || u.mail
                        .as_deref()
                        .map(|s| s.to_lowercase().starts_with(&needle))
                        .unwrap_or(false)
            })
            .cloned()
            .collect())
    }
}
