use async_trait::async_trait;
use dms_config::ArangoSettings;
use serde_json::{json, Value};

use crate::error::GraphError;
use crate::store::{Direction, GraphStore, ScoredDocument};

/// Thin REST client over ArangoDB's `/_api/document` and `/_api/cursor`
/// endpoints, grounded in the teacher's own `reqwest::Client` idiom
/// (`flow-client::Client`, `iam-auth`'s provider clients): one shared
/// client, a base URL built once at construction, JSON in and out. There
/// is no dedicated ArangoDB driver in the teacher's dependency graph and
/// the one candidate found in the wider retrieval pack (`ruarango`) ships
/// only as a manifest with no inspectable source, so rather than depend
/// on an API surface that cannot be verified offline, this adapter talks
/// to Arango's documented HTTP interface directly with `reqwest`, which
/// the teacher already depends on everywhere it needs an HTTP client.
pub struct ArangoStore {
    client: reqwest::Client,
    base_url: String,
    db_name: String,
}

#[derive(Debug, serde::Deserialize)]
struct ArangoErrorBody {
    #[serde(rename = "errorNum")]
    error_num: Option<u16>,
    #[serde(rename = "errorMessage")]
    error_message: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct CursorResponse {
    result: Vec<Value>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    code: u16,
    #[serde(rename = "errorMessage", default)]
    error_message: Option<String>,
}

impl ArangoStore {
    pub fn new(settings: &ArangoSettings) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: settings.host_url.trim_end_matches('/').to_string(),
            db_name: settings.db_name.clone(),
        }
    }

    fn db_url(&self, path: &str) -> String {
        format!("{}/_db/{}/{}", self.base_url, self.db_name, path)
    }

    async fn run_query(&self, query: &str, bind_vars: Value) -> Result<Vec<Value>, GraphError> {
        let response = self
            .client
            .post(self.db_url("_api/cursor"))
            .json(&json!({ "query": query, "bindVars": bind_vars }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body: ArangoErrorBody = response.json().await.unwrap_or(ArangoErrorBody {
                error_num: None,
                error_message: None,
            });
            return Err(GraphError::Arango {
                code: body.error_num.unwrap_or(status.as_u16()),
                message: body
                    .error_message
                    .unwrap_or_else(|| "unknown arango error".to_string()),
            });
        }

        let cursor: CursorResponse = response.json().await?;
        if cursor.error {
            return Err(GraphError::Arango {
                code: cursor.code,
                message: cursor
                    .error_message
                    .unwrap_or_else(|| "unknown arango error".to_string()),
            });
        }
        Ok(cursor.result)
    }
}

#[async_trait]
impl GraphStore for ArangoStore {
    async fn get_vertex(&self, collection: &str, key: &str) -> Result<Option<Value>, GraphError> {
        let response = self
            .client
            .get(self.db_url(&format!("_api/document/{collection}/{key}")))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let status = response.status();
            let body: ArangoErrorBody = response.json().await.unwrap_or(ArangoErrorBody {
                error_num: None,
                error_message: None,
            });
            return Err(GraphError::Arango {
                code: body.error_num.unwrap_or(status.as_u16()),
                message: body
                    .error_message
                    .unwrap_or_else(|| "unknown arango error".to_string()),
            });
        }
        Ok(Some(response.json().await?))
    }

    async fn insert_vertex(
        &self,
        collection: &str,
        key: &str,
        mut document: Value,
    ) -> Result<Value, GraphError> {
        if let Value::Object(ref mut map) = document {
            map.insert("_key".to_string(), json!(key));
        }
        let query =
            "INSERT @doc IN @@collection OPTIONS { overwriteMode: \"conflict\" } RETURN NEW";
        let results = self
            .run_query(query, json!({ "doc": document, "@collection": collection }))
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::NotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            })
    }

    async fn upsert_vertex(
        &self,
        collection: &str,
        key: &str,
        document: Value,
    ) -> Result<Value, GraphError> {
        let query = r#"
            UPSERT { _key: @key }
            INSERT MERGE(@doc, { _key: @key, created_at: DATE_ISO8601(DATE_NOW()), updated_at: DATE_ISO8601(DATE_NOW()) })
            UPDATE MERGE(@doc, { updated_at: DATE_ISO8601(DATE_NOW()) })
            IN @@collection
            RETURN NEW
        "#;
        let results = self
            .run_query(
                query,
                json!({ "key": key, "doc": document, "@collection": collection }),
            )
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::NotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            })
    }

    async fn upsert_edge(
        &self,
        collection: &str,
        from_handle: &str,
        to_handle: &str,
        key: &str,
        attrs: Value,
    ) -> Result<Value, GraphError> {
        self.ensure_edge_collection(collection).await?;

        let query = r#"
            UPSERT { _key: @key }
            INSERT MERGE(@attrs, {
                _key: @key, _from: @from, _to: @to,
                created_at: DATE_ISO8601(DATE_NOW()), updated_at: DATE_ISO8601(DATE_NOW())
            })
            UPDATE MERGE(@attrs, { _from: @from, _to: @to, updated_at: DATE_ISO8601(DATE_NOW()) })
            IN @@collection
            RETURN NEW
        "#;
        let results = self
            .run_query(
                query,
                json!({
                    "key": key,
                    "from": from_handle,
                    "to": to_handle,
                    "attrs": attrs,
                    "@collection": collection,
                }),
            )
            .await?;
        results
            .into_iter()
            .next()
            .ok_or_else(|| GraphError::NotFound {
                collection: collection.to_string(),
                key: key.to_string(),
            })
    }

    async fn traverse(
        &self,
        start_handle: &str,
        depth_min: u32,
        depth_max: u32,
        direction: Direction,
        edge_collections: &[&str],
    ) -> Result<Vec<Value>, GraphError> {
        let edges = edge_collections.join(", ");
        // Arango's `minDepth=1` traversal never yields the start vertex itself,
        // only vertices reached from it. The trait contract (store.rs) promises
        // `[start, parent, grandparent, ...]`, so when the caller asked for
        // depth_min <= 1 the start document is fetched separately and unioned
        // in front of the traversal, keeping the ordering the fake also produces.
        let traversal_min = depth_min.max(1);
        let query = format!(
            "LET start_doc = DOCUMENT(@start) \
             LET chain = (FOR v IN {traversal_min}..{depth_max} {} @start {edges} RETURN v) \
             RETURN {}",
            direction.as_aql(),
            if depth_min <= 1 {
                "APPEND([start_doc], chain)"
            } else {
                "chain"
            },
        );
        let rows = self.run_query(&query, json!({ "start": start_handle })).await?;
        Ok(match rows.into_iter().next() {
            Some(Value::Array(items)) => items,
            Some(other) => vec![other],
            None => Vec::new(),
        })
    }

    async fn search_view(
        &self,
        view: &str,
        search_fields: &[&str],
        query: &str,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>, GraphError> {
        let field_clauses: Vec<String> = search_fields
            .iter()
            .map(|f| format!("ANALYZER(doc.{f} IN TOKENS(@query, \"text_es\"), \"text_es\")"))
            .collect();
        let search_expr = field_clauses.join(" OR ");

        let aql = format!(
            r#"
            FOR doc IN @@view
              SEARCH {search_expr}
              LET score = BM25(doc)
              SORT score DESC
              LIMIT @limit
              RETURN {{ doc, score }}
            "#
        );

        let rows = self
            .run_query(
                &aql,
                json!({ "@view": view, "query": query, "limit": limit }),
            )
            .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let doc = row.get("doc")?.clone();
                let score = row.get("score")?.as_f64()?;
                Some(ScoredDocument { document: doc, score })
            })
            .collect())
    }

    async fn aql_query(&self, query: &str, bind_vars: Value) -> Result<Vec<Value>, GraphError> {
        self.run_query(query, bind_vars).await
    }

    async fn ensure_edge_collection(&self, collection: &str) -> Result<(), GraphError> {
        let response = self
            .client
            .post(self.db_url("_api/collection"))
            .json(&json!({ "name": collection, "type": 3 }))
            .send()
            .await?;

        if response.status().is_success() {
            return Ok(());
        }

        // 1207 = duplicate name: the collection already exists, which is the
        // common case after the first write. Anything else is a real error.
        let body: ArangoErrorBody = response.json().await.unwrap_or(ArangoErrorBody {
            error_num: None,
            error_message: None,
        });
        match body.error_num {
            Some(1207) => Ok(()),
            other => Err(GraphError::Arango {
                code: other.unwrap_or(0),
                message: body
                    .error_message
                    .unwrap_or_else(|| "failed to create edge collection".to_string()),
            }),
        }
    }
}
