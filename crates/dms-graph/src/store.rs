use async_trait::async_trait;
use serde_json::Value;

use crate::error::GraphError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outbound,
    Inbound,
    Any,
}

impl Direction {
    pub fn as_aql(&self) -> &'static str {
        match self {
            Direction::Outbound => "OUTBOUND",
            Direction::Inbound => "INBOUND",
            Direction::Any => "ANY",
        }
    }
}

/// A vertex or edge result row, scored when it came back from a search view
/// query (spec §4.1 "search view query helper").
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Value,
    pub score: f64,
}

/// Typed operations over vertex and edge collections (spec §4.1). Every
/// implementation must guarantee:
///
/// - traversal results are ordered `[start, parent, grandparent, ...]`
///   (the naming builder relies on this and reverses it itself);
/// - edge/vertex upserts stamp `created_at` on insert and `updated_at` on
///   update using the store's own clock, never the caller's;
/// - missing edge collections are created lazily on first write and are
///   never dropped.
#[async_trait]
pub trait GraphStore: Send + Sync {
    async fn get_vertex(&self, collection: &str, key: &str) -> Result<Option<Value>, GraphError>;

    async fn has_vertex(&self, collection: &str, key: &str) -> Result<bool, GraphError> {
        Ok(self.get_vertex(collection, key).await?.is_some())
    }

    async fn insert_vertex(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<Value, GraphError>;

    /// Insert-or-replace by `_key`, stamping `created_at`/`updated_at`.
    async fn upsert_vertex(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<Value, GraphError>;

    /// Insert-or-replace an edge keyed by `edge_key(from, to)` (spec §3.3
    /// "edge-key determinism"). `attrs` are merged onto the edge document
    /// in addition to `_from`/`_to`.
    async fn upsert_edge(
        &self,
        collection: &str,
        from_handle: &str,
        to_handle: &str,
        key: &str,
        attrs: Value,
    ) -> Result<Value, GraphError>;

    /// `[start, parent, grandparent, ...]` out to `depth_max` hops, over the
    /// union of `edge_collections`, following `direction`.
    async fn traverse(
        &self,
        start_handle: &str,
        depth_min: u32,
        depth_max: u32,
        direction: Direction,
        edge_collections: &[&str],
    ) -> Result<Vec<Value>, GraphError>;

    /// BM25-scored full text query against an ArangoSearch view (spec
    /// §4.5 step 3, §4.7.4 full-text filter).
    async fn search_view(
        &self,
        view: &str,
        search_fields: &[&str],
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, GraphError>;

    /// Escape hatch for the handful of call sites that need a bespoke AQL
    /// query (metadata filter catalog, fuzziness-aware search composition
    /// in `dms-search`) rather than one of the typed helpers above.
    async fn aql_query(&self, query: &str, bind_vars: Value) -> Result<Vec<Value>, GraphError>;

    /// Creates the edge collection if it does not already exist. A no-op
    /// if it does. Implementations must never drop a collection.
    async fn ensure_edge_collection(&self, collection: &str) -> Result<(), GraphError>;
}
