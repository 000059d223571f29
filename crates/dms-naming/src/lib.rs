//! Builds the hierarchical naming chain for a document from the
//! organizational graph (the "Naming Builder" component, spec §4.4).

use chrono::Local;
use dms_graph::{Direction, GraphStore};
use dms_types::edges::{BELONGS_TO, ENTITIES};
use dms_types::naming::{NamingPathNode, NamingRecord};
use dms_types::RequiredDocumentRef;

const MAX_HIERARCHY_DEPTH: u32 = 16;

/// Normalizes a schema `number`/`code_numeric` string so integer-valued
/// floats drop their trailing `.0` (spec §4.4: `213.0` → `"213"`, `213.9`
/// stays `"213.9"`). Represented as `String` end-to-end rather than `f64`
/// to avoid float-representation hazards elsewhere in the pipeline (spec
/// §9 open question); this is the one boundary where the round-trip
/// through `f64` is intentional and contained.
pub fn normalize_numeric(raw: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.fract() == 0.0 => format!("{value:.0}"),
        Ok(_) => raw.trim().to_string(),
        Err(_) => raw.trim().to_string(),
    }
}

fn join_skip_empty<'a>(values: impl Iterator<Item = &'a str>) -> String {
    values
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" / ")
}

/// `build_names` (spec §4.4): walks `belongs_to` from `leaf_entity_key` to
/// the root of the organizational graph, then assembles the naming
/// record. `required_document`, when present, folds its own code/name
/// into the trailing segment of `name_code`/`name_code_numeric`.
pub async fn build_names(
    graph: &dyn GraphStore,
    leaf_entity_key: &str,
    required_document: Option<&RequiredDocumentRef>,
) -> Result<NamingRecord, dms_graph::GraphError> {
    let start_handle = format!("{ENTITIES}/{leaf_entity_key}");
    let chain_leaf_to_root = graph
        .traverse(
            &start_handle,
            1,
            MAX_HIERARCHY_DEPTH,
            Direction::Outbound,
            &[BELONGS_TO],
        )
        .await?;

    // `traverse` already returns `[start, parent, grandparent, ...]`
    // (leaf-to-root); the naming builder works root-to-leaf, so reverse it.
    let mut path_nodes: Vec<NamingPathNode> = chain_leaf_to_root
        .into_iter()
        .map(|doc| NamingPathNode {
            key: doc
                .get("_key")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            name: doc
                .get("name")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            node_type: doc
                .get("type")
                .and_then(|v| v.as_str())
                .unwrap_or("entity")
                .to_string(),
            code: doc.get("code").and_then(|v| v.as_str()).map(String::from),
            code_numeric: doc
                .get("code_numeric")
                .and_then(|v| v.as_str())
                .map(String::from),
        })
        .collect();
    path_nodes.reverse();

    let names: Vec<&str> = path_nodes.iter().map(|n| n.name.as_str()).collect();
    let codes: Vec<&str> = path_nodes
        .iter()
        .filter_map(|n| n.code.as_deref())
        .collect();
    let codes_numeric: Vec<String> = path_nodes
        .iter()
        .filter_map(|n| n.code_numeric.as_deref())
        .map(normalize_numeric)
        .collect();

    let name_path = join_skip_empty(names.into_iter());
    let code_path = join_skip_empty(codes.iter().copied());
    let code_numeric_path = join_skip_empty(codes_numeric.iter().map(String::as_str));

    let leaf = path_nodes.last();
    let leaf_name = leaf.map(|n| n.name.as_str()).unwrap_or_default();

    // spec §4.4 / original's `parent = norm[-2]`: the combo is the
    // *immediate* parent's code joined with the leaf's own code, never the
    // full root→leaf ancestor chain (`code_path` already carries that).
    let parent = if path_nodes.len() >= 2 {
        path_nodes.get(path_nodes.len() - 2)
    } else {
        None
    };

    let mut name_segments: Vec<&str> = Vec::new();
    if let Some(code) = parent.and_then(|n| n.code.as_deref()) {
        name_segments.push(code);
    }
    if let Some(code) = leaf.and_then(|n| n.code.as_deref()) {
        name_segments.push(code);
    }

    let mut numeric_segments: Vec<String> = Vec::new();
    if let Some(code) = parent.and_then(|n| n.code_numeric.as_deref()) {
        numeric_segments.push(normalize_numeric(code));
    }
    if let Some(code) = leaf.and_then(|n| n.code_numeric.as_deref()) {
        numeric_segments.push(normalize_numeric(code));
    }

    let (name_combo, name_trailing) = match required_document {
        Some(doc) => {
            if let Some(code) = doc.code.as_deref() {
                name_segments.push(code);
            }
            (
                name_segments.join("-"),
                doc.name.clone().unwrap_or_else(|| leaf_name.to_string()),
            )
        }
        None => (name_segments.join("-"), leaf_name.to_string()),
    };
    let name_code = format!("{name_combo} - {name_trailing}");

    let (numeric_combo, numeric_trailing) = match required_document {
        Some(doc) => {
            if let Some(code) = doc.code.as_deref() {
                numeric_segments.push(normalize_numeric(code));
            }
            (
                numeric_segments.join("-"),
                doc.name.clone().unwrap_or_else(|| leaf_name.to_string()),
            )
        }
        None => (numeric_segments.join("-"), leaf_name.to_string()),
    };
    let name_code_numeric = format!("{numeric_combo} - {numeric_trailing}");

    let timestamp_tag = Local::now().format("%Y%m%d_%H%M%S").to_string();
    let display_name = format!("{name_code} - {timestamp_tag}");

    Ok(NamingRecord {
        name_path,
        code_path,
        code_numeric_path,
        name_code,
        name_code_numeric,
        display_name,
        timestamp_tag,
        required_document_code: required_document.and_then(|d| d.code.clone()),
        path_nodes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use dms_graph::InMemoryGraphStore;
    use serde_json::json;

    #[test]
    fn normalize_numeric_strips_trailing_zero() {
        assert_eq!(normalize_numeric("213.0"), "213");
        assert_eq!(normalize_numeric("213.9"), "213.9");
        assert_eq!(normalize_numeric("not-a-number"), "not-a-number");
    }

    #[tokio::test]
    async fn build_names_joins_root_to_leaf_and_combines_codes() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                ENTITIES,
                "fac-eng",
                json!({ "name": "Engineering", "type": "facultad", "code": "ENG", "code_numeric": "1.0" }),
            )
            .await
            .unwrap();
        graph
            .upsert_vertex(
                ENTITIES,
                "career-cs",
                json!({ "name": "Computer Science", "type": "carrera", "code": "CS", "code_numeric": "12.0" }),
            )
            .await
            .unwrap();
        graph
            .upsert_edge(
                BELONGS_TO,
                "entities/career-cs",
                "entities/fac-eng",
                "career-cs_fac-eng",
                json!({}),
            )
            .await
            .unwrap();

        let record = build_names(&graph, "career-cs", None).await.unwrap();
        assert_eq!(record.name_path, "Engineering / Computer Science");
        assert_eq!(record.code_path, "ENG / CS");
        assert_eq!(record.code_numeric_path, "1 / 12");
        assert_eq!(record.name_code, "ENG-CS - Computer Science");
        assert_eq!(record.name_code_numeric, "1-12 - Computer Science");
    }

    #[tokio::test]
    async fn build_names_with_required_document_appends_its_code_and_name() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                ENTITIES,
                "career-cs",
                json!({ "name": "Computer Science", "type": "carrera", "code": "CS", "code_numeric": "12" }),
            )
            .await
            .unwrap();

        let required = RequiredDocumentRef {
            id: Some("rd-1".to_string()),
            name: Some("Transcript".to_string()),
            code: Some("TRN".to_string()),
        };

        let record = build_names(&graph, "career-cs", Some(&required)).await.unwrap();
        assert_eq!(record.name_code, "CS-TRN - Transcript");
        assert_eq!(record.required_document_code.as_deref(), Some("TRN"));
    }

    #[tokio::test]
    async fn name_code_uses_only_the_immediate_parent_not_the_full_chain() {
        let graph = InMemoryGraphStore::new();
        graph
            .upsert_vertex(
                ENTITIES,
                "sede-main",
                json!({ "name": "Main Campus", "type": "sede", "code": "SEDE", "code_numeric": "1" }),
            )
            .await
            .unwrap();
        graph
            .upsert_vertex(
                ENTITIES,
                "fac-eng",
                json!({ "name": "Engineering", "type": "facultad", "code": "ENG", "code_numeric": "1.2" }),
            )
            .await
            .unwrap();
        graph
            .upsert_vertex(
                ENTITIES,
                "career-cs",
                json!({ "name": "Computer Science", "type": "carrera", "code": "CS", "code_numeric": "1.2.3" }),
            )
            .await
            .unwrap();
        graph
            .upsert_edge(BELONGS_TO, "entities/fac-eng", "entities/sede-main", "fac-eng_sede-main", json!({}))
            .await
            .unwrap();
        graph
            .upsert_edge(BELONGS_TO, "entities/career-cs", "entities/fac-eng", "career-cs_fac-eng", json!({}))
            .await
            .unwrap();

        let record = build_names(&graph, "career-cs", None).await.unwrap();
        assert_eq!(record.code_path, "SEDE / ENG / CS");
        assert_eq!(record.name_code, "ENG-CS - Computer Science");
        assert_eq!(record.name_code_numeric, "1.2-1.2.3 - Computer Science");
    }
}
