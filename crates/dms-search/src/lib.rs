//! Search & Authorization Engine: ABAC-aware document listing, the
//! metadata filter/entity browsing helpers, and the authenticated
//! download proxy (spec §4.7, Component G).

pub mod catalog;
pub mod error;
pub mod filters;
pub mod gate;
pub mod list;
pub mod proxy;
pub mod query;

pub use catalog::{entities_with_documents, metadata_filter_catalog};
pub use error::SearchError;
pub use filters::{fuzziness_for_value, DocumentSearchParams, MetadataFilterValue};
pub use gate::{resolve_status_gate, AllowedTeams, StatusGate};
pub use list::search_documents;
pub use proxy::{
    append_audit_download, authorize_download, content_disposition_inline, content_type_for_extension,
    resolve_document_by_storage_path, AuditDownloadRecord,
};
pub use query::{compose_list_query, QueryPlan};
