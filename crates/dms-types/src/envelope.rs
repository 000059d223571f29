use serde::{Deserialize, Serialize};

/// The common response envelope for protected reads (spec §6.2):
/// `{ success, message, data: { count?, data, pagination? } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }
}

/// Pagination metadata (spec §4.7.5, §6.2 — camelCase field names match the
/// wire contract exactly).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub to: u64,
    pub has_more_pages: bool,
}

impl Pagination {
    /// `last_page = max(1, ceil(total/limit))`, `to = offset + len(items)`,
    /// `has_more_pages = current_page < last_page` (spec §4.7.5).
    pub fn compute(page: u32, limit: u32, total: u64, returned: usize) -> Self {
        let limit_u64 = limit.max(1) as u64;
        let last_page = ((total + limit_u64 - 1) / limit_u64).max(1) as u32;
        let offset = (page.saturating_sub(1)) as u64 * limit_u64;
        Pagination {
            current_page: page,
            last_page,
            per_page: limit,
            total,
            to: offset + returned as u64,
            has_more_pages: page < last_page,
        }
    }
}

/// The paged body nested under `data` for list endpoints (spec §6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagedData<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pagination_last_page_rounds_up() {
        let p = Pagination::compute(1, 10, 25, 10);
        assert_eq!(p.last_page, 3);
        assert_eq!(p.to, 10);
        assert!(p.has_more_pages);
    }

    #[test]
    fn pagination_empty_total_is_single_page() {
        let p = Pagination::compute(1, 10, 0, 0);
        assert_eq!(p.last_page, 1);
        assert!(!p.has_more_pages);
    }

    #[test]
    fn pagination_last_page_has_no_more() {
        let p = Pagination::compute(3, 10, 25, 5);
        assert_eq!(p.to, 25);
        assert!(!p.has_more_pages);
    }

    #[test]
    fn paged_envelope_wire_shape() {
        let page = PagedData {
            data: vec!["doc-1".to_string(), "doc-2".to_string()],
            pagination: Pagination::compute(1, 2, 5, 2),
        };
        let response = ApiResponse::ok("ok", page);

        insta::assert_json_snapshot!(response, @r###"
        {
          "success": true,
          "message": "ok",
          "data": {
            "data": [
              "doc-1",
              "doc-2"
            ],
            "pagination": {
              "currentPage": 1,
              "lastPage": 3,
              "perPage": 2,
              "total": 5,
              "to": 2,
              "hasMorePages": true
            }
          }
        }
        "###);
    }
}
