//! Dynamic AQL query composition for `GET /documents` (spec §4.7.5):
//! each search option contributes its own clause to an additive `FILTER`
//! expression, building on the `aql_query` escape hatch `dms-graph`
//! deliberately leaves open for this crate.

use serde_json::{json, Map, Value};

use dms_types::edges::DOCUMENTS;

use crate::filters::{fuzziness_for_value, DocumentSearchParams, MetadataFilterValue};

/// A composed list query plus its matching count query, sharing one set
/// of bind variables so the two always agree on what they're counting.
pub struct QueryPlan {
    pub list_aql: String,
    pub count_aql: String,
    pub bind_vars: Value,
}

/// Builds the list/count query pair for `GET /documents` (spec §4.7.5
/// table). `allowed_entity_keys` is `None` when the caller's allowed
/// teams resolved to `"*"` (no ABAC clause at all); `Some(keys)` — even
/// `Some(&[])` — adds the reachability clause, which fails every
/// document when `keys` is empty (spec §4.7.3 fail-safe). `owner_only`,
/// when set, overrides `params.owner_id`/`params.current_user_id` (spec
/// §4.7.4: "owners see only their own pending work").
pub fn compose_list_query(
    params: &DocumentSearchParams,
    allowed_entity_keys: Option<&[String]>,
    owner_only: Option<&str>,
) -> QueryPlan {
    let mut clauses: Vec<String> = Vec::new();
    let mut bind_vars: Map<String, Value> = Map::new();

    let use_search_view = params.has_full_text_search();
    let collection = if use_search_view {
        "documents_search_view"
    } else {
        DOCUMENTS
    };
    bind_vars.insert("@collection".to_string(), json!(collection));

    if let Some(keys) = allowed_entity_keys {
        clauses.push(
            "LENGTH(FOR v IN 1..2 OUTBOUND doc file_located_in, belongs_to \
             FILTER v._key IN @allowed_entity_keys RETURN 1) > 0"
                .to_string(),
        );
        bind_vars.insert("allowed_entity_keys".to_string(), json!(keys));
    }

    let status = params.status_or_default();
    clauses.push("doc.status == @status".to_string());
    bind_vars.insert("status".to_string(), json!(status));

    let owner = owner_only
        .or(params.owner_id.as_deref())
        .or(params.current_user_id.as_deref());
    if let Some(owner) = owner {
        clauses.push("doc.owner.id == @owner_id".to_string());
        bind_vars.insert("owner_id".to_string(), json!(owner));
    }

    if let Some(entity_id) = &params.entity_id {
        clauses.push(
            "LENGTH(FOR v IN 1..5 OUTBOUND doc file_located_in, belongs_to \
             FILTER v._key == @entity_id RETURN 1) > 0"
                .to_string(),
        );
        bind_vars.insert("entity_id".to_string(), json!(entity_id));
    }

    let mut process_ids = params.process_ids.clone();
    if let Some(process_id) = &params.process_id {
        process_ids.push(process_id.clone());
    }
    if !process_ids.is_empty() {
        clauses.push(
            "LENGTH(FOR v IN 1..6 OUTBOUND doc complies_with, catalog_belongs_to \
             FILTER v._key IN @process_ids RETURN 1) > 0"
                .to_string(),
        );
        bind_vars.insert("process_ids".to_string(), json!(process_ids));
    }

    if let Some(required_doc) = &params.required_document_id {
        clauses.push(
            "LENGTH(FOR v IN 1..1 OUTBOUND doc complies_with \
             FILTER v._key == @required_document_id RETURN 1) > 0"
                .to_string(),
        );
        bind_vars.insert("required_document_id".to_string(), json!(required_doc));
    }

    if let Some(referenced) = &params.referenced_entity_id {
        clauses.push(
            "LENGTH(FOR v IN 1..1 OUTBOUND doc references \
             FILTER v._key == @referenced_entity_id RETURN 1) > 0"
                .to_string(),
        );
        bind_vars.insert("referenced_entity_id".to_string(), json!(referenced));
    }

    if let Some(schema_id) = &params.schema_id {
        clauses.push(
            "LENGTH(FOR v IN 1..1 OUTBOUND doc usa_esquema \
             FILTER v._key == @schema_id RETURN 1) > 0"
                .to_string(),
        );
        bind_vars.insert("schema_id".to_string(), json!(schema_id));
    }

    if let Some(date_from) = &params.date_from {
        clauses.push("doc.created_at >= @date_from".to_string());
        bind_vars.insert("date_from".to_string(), json!(format!("{date_from}T00:00:00.000000")));
    }
    if let Some(date_to) = &params.date_to {
        clauses.push("doc.created_at <= @date_to".to_string());
        bind_vars.insert("date_to".to_string(), json!(format!("{date_to}T23:59:59.999999")));
    }

    for (index, (field_key, value)) in params.metadata_filters.iter().enumerate() {
        let coalesced = format!(
            "(doc.validated_metadata.{field_key}.value || doc.validated_metadata.{field_key}.display_name \
             || doc.validated_metadata.{field_key}.name || doc.validated_metadata.{field_key})"
        );
        match value {
            MetadataFilterValue::Range { gte, lte } => {
                if let Some(gte) = gte {
                    let bind = format!("meta_gte_{index}");
                    clauses.push(format!("TO_NUMBER({coalesced}) >= @{bind}"));
                    bind_vars.insert(bind, json!(gte));
                }
                if let Some(lte) = lte {
                    let bind = format!("meta_lte_{index}");
                    clauses.push(format!("TO_NUMBER({coalesced}) <= @{bind}"));
                    bind_vars.insert(bind, json!(lte));
                }
            }
            MetadataFilterValue::Scalar(raw) => {
                let text = raw.as_str().map(str::to_string).unwrap_or_else(|| raw.to_string());
                let fuzziness = params.fuzziness.unwrap_or_else(|| fuzziness_for_value(&text));
                let value_bind = format!("meta_val_{index}");
                let fuzz_bind = format!("meta_fuzz_{index}");
                clauses.push(format!(
                    "(CONTAINS(LOWER(TO_STRING({coalesced})), LOWER(@{value_bind})) \
                     OR LEVENSHTEIN_DISTANCE(LOWER(TO_STRING({coalesced})), LOWER(@{value_bind})) <= @{fuzz_bind})"
                ));
                bind_vars.insert(value_bind, json!(text));
                bind_vars.insert(fuzz_bind, json!(fuzziness));
            }
        }
    }

    let where_clause = if clauses.is_empty() {
        "true".to_string()
    } else {
        clauses.join("\n    AND ")
    };

    // Full-text search sorts by BM25 first, `created_at DESC` otherwise
    // (spec §4.7.5); `documents_search_view`'s SEARCH clause belongs
    // before the plain FILTER so ArangoSearch can apply the index.
    let (search_clause, sort_clause) = if use_search_view {
        bind_vars.insert(
            "search_query".to_string(),
            json!(params.search.clone().unwrap_or_default()),
        );
        (
            "SEARCH ANALYZER(doc.naming.display_name IN TOKENS(@search_query, \"text_es\") \
             OR doc.original_filename IN TOKENS(@search_query, \"text_es\"), \"text_es\")\n  LET _score = BM25(doc)\n "
                .to_string(),
            "SORT _score DESC, doc.created_at DESC".to_string(),
        )
    } else {
        (String::new(), "SORT doc.created_at DESC".to_string())
    };

    let limit = params.limit.max(1);
    bind_vars.insert("offset".to_string(), json!(params.offset()));
    bind_vars.insert("limit".to_string(), json!(limit));

    let list_aql = format!(
        "FOR doc IN @@collection\n  {search_clause}FILTER {where_clause}\n  {sort_clause}\n  LIMIT @offset, @limit\n  RETURN doc"
    );
    let count_aql = format!(
        "FOR doc IN @@collection\n  {search_clause}FILTER {where_clause}\n  COLLECT WITH COUNT INTO total\n  RETURN total"
    );

    QueryPlan {
        list_aql,
        count_aql,
        bind_vars: Value::Object(bind_vars),
    }
}
