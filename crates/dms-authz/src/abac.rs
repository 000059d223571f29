//! ABAC team-code resolution (spec §4.7.3): `"<PREFIX>:<code>"` scope
//! strings resolve to `entities` vertex keys.

use dms_graph::GraphStore;
use dms_types::edges::ENTITIES;
use serde_json::json;

use crate::error::AuthzError;

fn prefix_to_entity_type(prefix: &str) -> Option<&'static str> {
    match prefix {
        "CARR" => Some("carrera"),
        "FAC" => Some("facultad"),
        "DEP" => Some("departamento"),
        _ => None,
    }
}

/// Resolves `team_ids` shaped `"<PREFIX>:<code>"` to `entities._key` values
/// (spec §4.7.3). Entries that don't parse, don't map to a known prefix, or
/// resolve to nothing are skipped — the caller treats an empty result as
/// fail-safe (no access), not an error.
pub async fn resolve_team_entity_keys(
    graph: &dyn GraphStore,
    team_ids: &[String],
) -> Result<Vec<String>, AuthzError> {
    let mut keys = Vec::new();

    for team_id in team_ids {
        let Some((prefix, code)) = team_id.split_once(':') else {
            continue;
        };
        let Some(entity_type) = prefix_to_entity_type(prefix) else {
            continue;
        };

        let rows = graph
            .aql_query(
                r#"
                FOR e IN @@collection
                    FILTER e.type == @entity_type
                    FILTER e.code == @code
                        OR TO_STRING(e.code) == @code
                        OR TO_STRING(e.code_numeric) == @code
                    LIMIT 1
                    RETURN e
                "#,
                json!({ "@collection": ENTITIES, "entity_type": entity_type, "code": code }),
            )
            .await?;

        if let Some(key) = rows.first().and_then(|d| d.get("_key")).and_then(|v| v.as_str()) {
            keys.push(key.to_string());
        }
    }

    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use serde_json::json;

    #[tokio::test]
    async fn resolves_numeric_code_by_string_comparison() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                ENTITIES,
                "career-cs",
                json!({ "name": "Computer Science", "type": "carrera", "code": "CS", "code_numeric": "213.9" }),
            )
            .await
            .unwrap();

        let keys = resolve_team_entity_keys(&graph, &["CARR:213.9".to_string()])
            .await
            .unwrap();
        assert_eq!(keys, vec!["career-cs".to_string()]);
    }

    #[tokio::test]
    async fn unmatched_code_resolves_to_empty() {
        let graph = InMemoryGraphStore::new();
        let keys = resolve_team_entity_keys(&graph, &["CARR:999".to_string()]).await.unwrap();
        assert!(keys.is_empty());
    }

    #[tokio::test]
    async fn unparseable_or_unknown_prefix_is_skipped() {
        let graph = InMemoryGraphStore::new();
        let keys = resolve_team_entity_keys(
            &graph,
            &["*".to_string(), "UNKNOWN:1".to_string(), "no-colon".to_string()],
        )
        .await
        .unwrap();
        assert!(keys.is_empty());
    }
}
