use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::GraphError;
use crate::store::{Direction, GraphStore, ScoredDocument};

/// In-memory `GraphStore` used by crate tests elsewhere in the workspace,
/// mirroring how the teacher isolates `sqlx::PgPool` behind a narrow
/// `repo` seam rather than hitting a real database in unit tests. Not
/// exported outside `#[cfg(test)]`-gated call sites; real wiring always
/// uses `ArangoStore`.
#[derive(Default)]
pub struct InMemoryGraphStore {
    vertices: Mutex<HashMap<(String, String), Value>>,
    edges: Mutex<HashMap<(String, String), Value>>,
    edge_collections: Mutex<std::collections::HashSet<String>>,
}

impl InMemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn handle(collection: &str, key: &str) -> String {
        format!("{collection}/{key}")
    }
}

#[async_trait]
impl GraphStore for InMemoryGraphStore {
    async fn get_vertex(&self, collection: &str, key: &str) -> Result<Option<Value>, GraphError> {
        let vertices = self.vertices.lock().unwrap();
        Ok(vertices
            .get(&(collection.to_string(), key.to_string()))
            .cloned())
    }

    async fn insert_vertex(
        &self,
        collection: &str,
        key: &str,
        mut document: Value,
    ) -> Result<Value, GraphError> {
        let now = Utc::now().to_rfc3339();
        if let Value::Object(ref mut map) = document {
            map.insert("_key".to_string(), json!(key));
            map.insert("created_at".to_string(), json!(now));
            map.insert("updated_at".to_string(), json!(now));
        }
        self.vertices
            .lock()
            .unwrap()
            .insert((collection.to_string(), key.to_string()), document.clone());
        Ok(document)
    }

    async fn upsert_vertex(
        &self,
        collection: &str,
        key: &str,
        mut document: Value,
    ) -> Result<Value, GraphError> {
        let now = Utc::now().to_rfc3339();
        let mut vertices = self.vertices.lock().unwrap();
        let id = (collection.to_string(), key.to_string());
        let existing = vertices.get(&id).cloned();

        if let Value::Object(ref mut map) = document {
            map.insert("_key".to_string(), json!(key));
            map.insert("updated_at".to_string(), json!(now.clone()));
            match existing.as_ref().and_then(|e| e.get("created_at")) {
                Some(created_at) => {
                    map.insert("created_at".to_string(), created_at.clone());
                }
                None => {
                    map.insert("created_at".to_string(), json!(now));
                }
            }
        }

        vertices.insert(id, document.clone());
        Ok(document)
    }

    async fn upsert_edge(
        &self,
        collection: &str,
        from_handle: &str,
        to_handle: &str,
        key: &str,
        mut attrs: Value,
    ) -> Result<Value, GraphError> {
        self.ensure_edge_collection(collection).await?;
        let now = Utc::now().to_rfc3339();
        let mut edges = self.edges.lock().unwrap();
        let id = (collection.to_string(), key.to_string());
        let existing = edges.get(&id).cloned();

        if let Value::Object(ref mut map) = attrs {
            map.insert("_key".to_string(), json!(key));
            map.insert("_from".to_string(), json!(from_handle));
            map.insert("_to".to_string(), json!(to_handle));
            map.insert("updated_at".to_string(), json!(now.clone()));
            match existing.as_ref().and_then(|e| e.get("created_at")) {
                Some(created_at) => {
                    map.insert("created_at".to_string(), created_at.clone());
                }
                None => {
                    map.insert("created_at".to_string(), json!(now));
                }
            }
        }

        edges.insert(id, attrs.clone());
        Ok(attrs)
    }

    async fn traverse(
        &self,
        start_handle: &str,
        _depth_min: u32,
        depth_max: u32,
        direction: Direction,
        edge_collections: &[&str],
    ) -> Result<Vec<Value>, GraphError> {
        let edges = self.edges.lock().unwrap();
        let mut chain = vec![start_handle.to_string()];
        let mut current = start_handle.to_string();

        for _ in 0..depth_max {
            let next = edges.iter().find_map(|((collection, _), edge)| {
                if !edge_collections.is_empty() && !edge_collections.contains(&collection.as_str())
                {
                    return None;
                }
                let from = edge.get("_from")?.as_str()?;
                let to = edge.get("_to")?.as_str()?;
                match direction {
                    Direction::Outbound if from == current => Some(to.to_string()),
                    Direction::Inbound if to == current => Some(from.to_string()),
                    Direction::Any if from == current => Some(to.to_string()),
                    Direction::Any if to == current => Some(from.to_string()),
                    _ => None,
                }
            });

            match next {
                Some(handle) => {
                    chain.push(handle.clone());
                    current = handle;
                }
                None => break,
            }
        }

        let vertices = self.vertices.lock().unwrap();
        Ok(chain
            .into_iter()
            .filter_map(|handle| {
                let (collection, key) = handle.split_once('/')?;
                vertices
                    .get(&(collection.to_string(), key.to_string()))
                    .cloned()
            })
            .collect())
    }

    async fn search_view(
        &self,
        _view: &str,
        search_fields: &[&str],
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, GraphError> {
        let vertices = self.vertices.lock().unwrap();
        let needle = query.to_lowercase();
        let mut matches: Vec<ScoredDocument> = vertices
            .values()
            .filter_map(|doc| {
                let haystack: String = search_fields
                    .iter()
                    .filter_map(|f| doc.get(f).and_then(|v| v.as_str()))
                    .collect::<Vec<_>>()
                    .join(" ")
                    .to_lowercase();
                if haystack.is_empty() {
                    return None;
                }
                if haystack.contains(&needle) {
                    let score = needle.len() as f64 / haystack.len().max(1) as f64;
                    Some(ScoredDocument {
                        document: doc.clone(),
                        score,
                    })
                } else {
                    None
                }
            })
            .collect();
        matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap());
        matches.truncate(limit);
        Ok(matches)
    }

    async fn aql_query(&self, _query: &str, _bind_vars: Value) -> Result<Vec<Value>, GraphError> {
        Ok(self.vertices.lock().unwrap().values().cloned().collect())
    }

    async fn ensure_edge_collection(&self, collection: &str) -> Result<(), GraphError> {
        self.edge_collections
            .lock()
            .unwrap()
            .insert(collection.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn upsert_vertex_preserves_created_at_across_updates() {
        let store = InMemoryGraphStore::new();
        let first = store
            .upsert_vertex("entities", "e1", json!({ "name": "Engineering" }))
            .await
            .unwrap();
        let created_at = first.get("created_at").unwrap().clone();

        let second = store
            .upsert_vertex("entities", "e1", json!({ "name": "Engineering Dept" }))
            .await
            .unwrap();
        assert_eq!(second.get("created_at").unwrap(), &created_at);
        assert_eq!(second.get("name").unwrap(), "Engineering Dept");
    }

    #[tokio::test]
    async fn traverse_returns_start_then_ancestors() {
        let store = InMemoryGraphStore::new();
        store
            .upsert_vertex("entities", "leaf", json!({ "name": "Career" }))
            .await
            .unwrap();
        store
            .upsert_vertex("entities", "parent", json!({ "name": "Faculty" }))
            .await
            .unwrap();
        store
            .upsert_edge(
                "belongs_to",
                "entities/leaf",
                "entities/parent",
                "leaf_parent",
                json!({}),
            )
            .await
            .unwrap();

        let chain = store
            .traverse("entities/leaf", 1, 5, Direction::Outbound, &["belongs_to"])
            .await
            .unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].get("name").unwrap(), "Career");
        assert_eq!(chain[1].get("name").unwrap(), "Faculty");
    }
}
