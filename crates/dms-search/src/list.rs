//! Paged document retrieval under ABAC (spec §4.7): resolves the
//! caller's scopes, applies the status gate, composes and executes the
//! list/count query pair, and assembles the paged envelope.

use tracing::warn;

use dms_authz::{resolve_team_entity_keys, scopes_for, AuthContext, MicroservicesData, SessionCache};
use dms_graph::GraphStore;
use dms_types::{Document, PagedData, Pagination};

use crate::error::SearchError;
use crate::filters::DocumentSearchParams;
use crate::gate::{resolve_status_gate, AllowedTeams};
use crate::query::compose_list_query;

const PERMISSION_READ: &str = "document.read";
const PERMISSION_APPROVE: &str = "workflow.approve";
const PERMISSION_REJECT: &str = "workflow.reject";

/// Runs the full `GET /documents` pipeline (spec §4.7): scope resolution,
/// status gating, ABAC entity-key resolution, dynamic query composition,
/// and pagination.
pub async fn search_documents(
    graph: &dyn GraphStore,
    cache: &dyn SessionCache,
    ctx: &AuthContext,
    microservice_id: &str,
    microservices_data: Option<&MicroservicesData>,
    params: DocumentSearchParams,
) -> Result<PagedData<Document>, SearchError> {
    let read_teams = scopes_for(cache, ctx, microservice_id, PERMISSION_READ, microservices_data).await;
    let approve_teams = scopes_for(cache, ctx, microservice_id, PERMISSION_APPROVE, microservices_data).await;
    let reject_teams = scopes_for(cache, ctx, microservice_id, PERMISSION_REJECT, microservices_data).await;

    let status = params.status_or_default();
    let gate = resolve_status_gate(&status, &ctx.user_id, &read_teams, &approve_teams, &reject_teams)?;

    let allowed_entity_keys = match &gate.allowed {
        AllowedTeams::Any => None,
        AllowedTeams::Teams(teams) => Some(resolve_team_entity_keys(graph, teams).await?),
    };

    let plan = compose_list_query(&params, allowed_entity_keys.as_deref(), gate.owner_only.as_deref());

    let total = graph
        .aql_query(&plan.count_aql, plan.bind_vars.clone())
        .await?
        .first()
        .and_then(|v| v.as_u64())
        .unwrap_or(0);

    let rows = graph.aql_query(&plan.list_aql, plan.bind_vars).await?;
    let documents: Vec<Document> = rows
        .into_iter()
        .filter_map(|row| match serde_json::from_value::<Document>(row.clone()) {
            Ok(doc) => Some(doc),
            Err(err) => {
                warn!(error = %err, row = %row, "skipping malformed document row in search results");
                None
            }
        })
        .collect();

    let pagination = Pagination::compute(params.page.max(1), params.limit.max(1), total, documents.len());

    Ok(PagedData {
        data: documents,
        pagination,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_authz::InMemorySessionCache;
    use dms_graph::InMemoryGraphStore;

    fn ctx(team_ids: Vec<&str>) -> AuthContext {
        AuthContext {
            user_id: "u1".to_string(),
            token_hash: "h".to_string(),
            token_type: "bearer".to_string(),
            tenant_id: Some("t1".to_string()),
            team_ids: team_ids.into_iter().map(String::from).collect(),
            permissions: vec![],
            roles: vec![],
        }
    }

    #[tokio::test]
    async fn no_document_read_scope_is_forbidden() {
        let graph = InMemoryGraphStore::new();
        let cache = InMemorySessionCache::new();
        let err = search_documents(
            &graph,
            &cache,
            &ctx(vec![]),
            "dms",
            None,
            DocumentSearchParams {
                status: Some("validated".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, SearchError::Forbidden));
    }

    #[tokio::test]
    async fn wildcard_read_scope_returns_an_empty_page_over_the_fake_store() {
        let graph = InMemoryGraphStore::new();
        let cache = InMemorySessionCache::new();
        cache.add_to_set("perm:t1:dms:u1:global", "document.read");

        let page = search_documents(
            &graph,
            &cache,
            &ctx(vec!["global"]),
            "dms",
            None,
            DocumentSearchParams {
                status: Some("validated".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // InMemoryGraphStore's aql_query is a dumb fake (ignores bind
        // vars), so it returns every seeded vertex rather than honoring
        // the FILTER; production filtering is exercised at the AQL
        // composition layer (see query.rs tests). This only proves the
        // plumbing (scopes -> gate -> query -> pagination) doesn't
        // error for the wildcard path.
        assert_eq!(page.pagination.current_page, 1);
    }
}
