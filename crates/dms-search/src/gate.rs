//! Status-aware visibility gating (spec §4.7.4): which team scopes (or
//! `"*"`) may see documents at a given status, and whether the result set
//! must additionally be pinned to the caller's own documents.

use std::collections::BTreeSet;

use dms_authz::WILDCARD_TEAM;
use dms_types::DocumentStatus;

/// The team-key restriction a query must apply, resolved from the
/// caller's scopes for the requested status (spec §4.7.4).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowedTeams {
    /// `"*"` is in scope: no team restriction at all.
    Any,
    /// Restrict to documents reachable from one of these team-resolved
    /// entity keys. Never empty — an empty scope list is rejected before
    /// this point (see [`resolve_status_gate`]).
    Teams(Vec<String>),
}

#[derive(Debug, Clone)]
pub struct StatusGate {
    pub allowed: AllowedTeams,
    /// Set for the sensitive status set (spec §4.7.4: "owners see only
    /// their own pending work"); `None` otherwise.
    pub owner_only: Option<String>,
}

/// The caller has no scope at all for the permission governing this
/// status (spec §7: "no scopes resolved for sensitive status" generalizes
/// to "no read scope at all" for every status — an empty allow list is a
/// permission failure, not an empty page; a *resolved-to-nothing* team
/// code, by contrast, is the fail-safe empty page of spec §4.7.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoScopesForStatus;

/// Resolves the allow-list for one `status` parameter value (spec
/// §4.7.4). `read_teams`/`approve_teams`/`reject_teams` are the scope
/// lists already produced by `dms_authz::scopes_for` for
/// `document.read`/`workflow.approve`/`workflow.reject` respectively.
pub fn resolve_status_gate(
    status: &str,
    caller_id: &str,
    read_teams: &[String],
    approve_teams: &[String],
    reject_teams: &[String],
) -> Result<StatusGate, NoScopesForStatus> {
    if !DocumentStatus::is_sensitive_str(status) {
        return Ok(StatusGate {
            allowed: teams_to_allowed(read_teams).ok_or(NoScopesForStatus)?,
            owner_only: None,
        });
    }

    if has_wildcard(approve_teams) || has_wildcard(reject_teams) {
        return Ok(StatusGate {
            allowed: AllowedTeams::Any,
            owner_only: Some(caller_id.to_string()),
        });
    }

    let union: BTreeSet<String> = approve_teams.iter().chain(reject_teams.iter()).cloned().collect();
    if union.is_empty() {
        return Err(NoScopesForStatus);
    }

    Ok(StatusGate {
        allowed: AllowedTeams::Teams(union.into_iter().collect()),
        owner_only: Some(caller_id.to_string()),
    })
}

fn has_wildcard(teams: &[String]) -> bool {
    teams.iter().any(|t| t == WILDCARD_TEAM)
}

fn teams_to_allowed(teams: &[String]) -> Option<AllowedTeams> {
    if has_wildcard(teams) {
        Some(AllowedTeams::Any)
    } else if teams.is_empty() {
        None
    } else {
        Some(AllowedTeams::Teams(teams.to_vec()))
    }
}
