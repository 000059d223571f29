use serde::{Deserialize, Serialize};

/// Permissions cached alongside a `dms_users` vertex (spec §3.1).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DmsPermissions {
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub teams: Vec<String>,
}

/// A `dms_users` vertex: the local identity cache (spec §3.1).
///
/// Invariant: `key == sanitize(guid_ms)` (spec §8 property 4); unique
/// `guid_ms`; unique sparse `email`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DmsUser {
    #[serde(rename = "_key")]
    pub key: String,
    pub guid_ms: Option<String>,
    pub name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub status: String,
    pub source: String,
    #[serde(default)]
    pub dms_permissions: DmsPermissions,
}

/// A candidate returned by the external identity directory's prefix search
/// (spec §4.3 step 4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryUser {
    pub id: String,
    pub display_name: String,
    pub given_name: Option<String>,
    pub surname: Option<String>,
    pub mail: Option<String>,
    pub user_principal_name: Option<String>,
}

impl DirectoryUser {
    /// The best-effort email for this candidate, preferring `mail` over
    /// `userPrincipalName` (spec §4.3 step 1: "`match.get("mail") or
    /// match.get("email") or match.get("userPrincipalName")`").
    pub fn email(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
    }
}

/// The minimal `{id, display_name, email, type: "user", value}` shape a
/// resolved user takes once embedded in `validated_metadata` (spec §3.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSnapshot {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

/// Sanitizes an Azure GUID into a `dms_users` storage key: lowercase, strip
/// hyphens, drop any character outside `[a-z0-9_]` (spec §4.3, §8 property
/// 4). Returns `None` if the result would be empty.
pub fn sanitize_guid_key(input: &str) -> Option<String> {
    let lowered = input.to_lowercase();
    let sanitized: String = lowered
        .chars()
        .filter(|c| *c != '-')
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if sanitized.is_empty() {
        None
    } else {
        Some(sanitized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_hyphens_and_case() {
        assert_eq!(
            sanitize_guid_key("3FA9C1-AB12-44DD-9C3E-11223344AABB"),
            Some("3fa9c1ab1244dd9c3e11223344aabb".to_string())
        );
    }

    #[test]
    fn drops_non_alphanumeric() {
        assert_eq!(sanitize_guid_key("a.b c!d"), Some("abcd".to_string()));
    }

    #[test]
    fn empty_result_rejected() {
        assert_eq!(sanitize_guid_key("---..."), None);
    }
}
