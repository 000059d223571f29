use serde::{Deserialize, Serialize};

/// A single node on the root→leaf path used for naming-builder debugging
/// (spec §4.4 `path_nodes`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingPathNode {
    pub key: String,
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub code: Option<String>,
    pub code_numeric: Option<String>,
}

/// The record returned by the naming builder (spec §4.4) and stored as
/// `documents.naming`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamingRecord {
    pub name_path: String,
    pub code_path: String,
    pub code_numeric_path: String,
    pub name_code: String,
    pub name_code_numeric: String,
    pub display_name: String,
    pub timestamp_tag: String,
    pub required_document_code: Option<String>,
    #[serde(default)]
    pub path_nodes: Vec<NamingPathNode>,
}
