//! Wire-level search parameters accepted by `GET /documents` (spec §4.7.5,
//! §6.2), plus the fuzziness-bucket rule used by the metadata filter clause.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of the `metadata_filters` query param (spec §4.7.5): either a
/// fuzzy scalar match or a numeric `{gte, lte}` range.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum MetadataFilterValue {
    Range {
        gte: Option<f64>,
        lte: Option<f64>,
    },
    Scalar(Value),
}

/// `GET /documents` query parameters (spec §6.2). `metadata_filters` and
/// `fuzziness` arrive as a JSON blob and an integer respectively, per the
/// route table.
#[derive(Debug, Clone, Deserialize)]
pub struct DocumentSearchParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
    pub entity_id: Option<String>,
    pub process_id: Option<String>,
    #[serde(default)]
    pub process_ids: Vec<String>,
    pub status: Option<String>,
    pub search: Option<String>,
    pub required_document_id: Option<String>,
    pub referenced_entity_id: Option<String>,
    pub schema_id: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
    pub owner_id: Option<String>,
    pub current_user_id: Option<String>,
    #[serde(default)]
    pub metadata_filters: BTreeMap<String, MetadataFilterValue>,
    /// Overrides the per-value fuzziness bucket (spec §6.2: `0-4`) when
    /// present; otherwise each scalar filter gets its own bucket from
    /// [`fuzziness_for_value`].
    pub fuzziness: Option<u8>,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    20
}

impl Default for DocumentSearchParams {
    fn default() -> Self {
        DocumentSearchParams {
            page: default_page(),
            limit: default_limit(),
            entity_id: None,
            process_id: None,
            process_ids: Vec::new(),
            status: None,
            search: None,
            required_document_id: None,
            referenced_entity_id: None,
            schema_id: None,
            date_from: None,
            date_to: None,
            owner_id: None,
            current_user_id: None,
            metadata_filters: BTreeMap::new(),
            fuzziness: None,
        }
    }
}

impl DocumentSearchParams {
    /// The status parameter defaults to `"attention_required"` (spec
    /// §4.7.4).
    pub fn status_or_default(&self) -> String {
        self.status
            .clone()
            .unwrap_or_else(|| dms_types::DocumentStatus::default_query_status().as_str().to_string())
    }

    pub fn offset(&self) -> u32 {
        self.page.saturating_sub(1) * self.limit.max(1)
    }

    pub fn has_full_text_search(&self) -> bool {
        self.search.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
    }
}

/// Fuzziness bucket per value length (spec §4.7.5, §8 boundary behaviors):
/// `len <= 6 -> 1`, `len <= 16 -> 2`, else `3`.
pub fn fuzziness_for_value(value: &str) -> u8 {
    let len = value.chars().count();
    if len <= 6 {
        1
    } else if len <= 16 {
        2
    } else {
        3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fuzziness_buckets_match_boundary_lengths() {
        assert_eq!(fuzziness_for_value("foobar"), 1);
        assert_eq!(fuzziness_for_value("foobar7"), 2);
        assert_eq!(fuzziness_for_value(&"a".repeat(16)), 2);
        assert_eq!(fuzziness_for_value(&"a".repeat(17)), 3);
    }

    #[test]
    fn status_defaults_to_attention_required() {
        let params = DocumentSearchParams::default();
        assert_eq!(params.status_or_default(), "attention_required");
    }

    #[test]
    fn offset_computes_from_page_and_limit() {
        let params = DocumentSearchParams {
            page: 3,
            limit: 10,
            ..Default::default()
        };
        assert_eq!(params.offset(), 20);
    }
}
