//! Edge collection names (spec §3.3). Fixed to the current vocabulary per
//! the open question in spec §9: legacy names (`pertenece_a`, `entidades`)
//! are rejected outright, never dual-supported.

pub const ENTITIES: &str = "entities";
pub const SUBSYSTEMS: &str = "subsystems";
pub const PROCESS_CATEGORIES: &str = "process_categories";
pub const PROCESSES: &str = "processes";
pub const REQUIRED_DOCUMENTS: &str = "required_documents";
pub const META_SCHEMAS: &str = "meta_schemas";
pub const DMS_USERS: &str = "dms_users";
pub const DOCUMENTS: &str = "documents";
pub const AUDIT_DOWNLOADS: &str = "audit_downloads";

pub const BELONGS_TO: &str = "belongs_to";
pub const CATALOG_BELONGS_TO: &str = "catalog_belongs_to";
pub const FILE_LOCATED_IN: &str = "file_located_in";
pub const USA_ESQUEMA: &str = "usa_esquema";
pub const COMPLIES_WITH: &str = "complies_with";
pub const REFERENCES: &str = "references";

/// The set of legacy collection/edge names this service must actively
/// reject rather than silently accept (spec §9 open question).
pub const REJECTED_LEGACY_NAMES: &[&str] = &["pertenece_a", "entidades"];

/// Deterministic edge key: `from_key + "_" + to_key` (spec §3.3, §8
/// property 2). `from_key`/`to_key` are the bare `_key` values, not the
/// full `collection/key` handles.
pub fn edge_key(from_key: &str, to_key: &str) -> String {
    format!("{from_key}_{to_key}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_key_is_deterministic() {
        assert_eq!(edge_key("T1", "e9"), "T1_e9");
        assert_eq!(edge_key("T1", "e9"), edge_key("T1", "e9"));
    }
}
