//! `/documents/*` and `/storage/proxy/*` handlers (spec §6.2): the thin
//! axum glue between HTTP and the `dms-search`/`dms-confirm` engines,
//! generalized from the teacher's own `control::controllers::sessions`
//! (extract context + path/body, call the service layer, map the result
//! through `view`/`IntoResponse`).

use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Extension, Path, Query, RawQuery, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use dms_authz::{scopes_for, AuthContext};
use dms_confirm::{confirm, dry_run_validation, verify, ConfirmContext, ConfirmRequest};
use dms_graph::{Direction, GraphStore};
use dms_identity::IdentityResolver;
use dms_search::{
    append_audit_download, authorize_download, content_disposition_inline, content_type_for_extension,
    metadata_filter_catalog, resolve_document_by_storage_path, search_documents, AuditDownloadRecord,
    DocumentSearchParams,
};
use dms_types::edges::{COMPLIES_WITH, ENTITIES, FILE_LOCATED_IN, META_SCHEMAS, REQUIRED_DOCUMENTS, USA_ESQUEMA};
use dms_types::{ApiResponse, Document, EntityRef, RequiredDocument, SchemaRef};

use crate::context::AppContext;
use crate::error::{from_authz, from_confirm, from_graph, from_search, AppError};

const PERMISSION_READ: &str = "document.read";

/// `GET /documents` (spec §4.7.5, §6.2).
///
/// `metadata_filters` arrives as a JSON object embedded in the query string
/// rather than a flat key, so this reads the raw query instead of going
/// through [`Query`]'s flat `serde_urlencoded`-style deserialization, which
/// cannot express a nested map.
pub async fn list(
    State(ctx): State<Arc<AppContext>>,
    Extension(auth): Extension<AuthContext>,
    RawQuery(raw): RawQuery,
) -> Result<Json<ApiResponse<dms_types::PagedData<Document>>>, AppError> {
    let params = parse_search_params(raw.as_deref())?;
    let page = search_documents(
        ctx.graph.as_ref(),
        ctx.cache.as_ref(),
        &auth,
        &ctx.settings.dms_microservice_id,
        ctx.microservices_data.as_deref(),
        params,
    )
    .await
    .map_err(from_search)?;

    Ok(Json(ApiResponse::ok("ok", page)))
}

/// Builds a [`DocumentSearchParams`] from a raw query string, decoding
/// `metadata_filters` as a JSON object and `page`/`limit`/`fuzziness` as
/// integers so [`MetadataFilterValue`](dms_search::filters::MetadataFilterValue)'s
/// untagged `Range`/`Scalar` variants deserialize against real JSON types
/// rather than strings.
fn parse_search_params(raw: Option<&str>) -> Result<DocumentSearchParams, AppError> {
    let mut fields = Map::new();
    let mut process_ids = Vec::new();

    for (key, value) in url::form_urlencoded::parse(raw.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "metadata_filters" => {
                let parsed: Value = serde_json::from_str(&value)
                    .map_err(|e| AppError::Validation(format!("metadata_filters must be a JSON object: {e}")))?;
                fields.insert("metadata_filters".to_string(), parsed);
            }
            "process_ids" => process_ids.push(Value::String(value.into_owned())),
            "page" | "limit" | "fuzziness" => {
                let n: i64 = value
                    .parse()
                    .map_err(|_| AppError::Validation(format!("{key} must be an integer")))?;
                fields.insert(key.to_string(), Value::from(n));
            }
            _ => {
                fields.insert(key.to_string(), Value::String(value.into_owned()));
            }
        }
    }

    if !process_ids.is_empty() {
        fields.insert("process_ids".to_string(), Value::Array(process_ids));
    }

    serde_json::from_value(Value::Object(fields))
        .map_err(|e| AppError::Validation(format!("invalid query parameters: {e}")))
}

#[derive(Debug, Serialize)]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub context_entity: Option<EntityRef>,
    pub used_schema: Option<SchemaRef>,
    pub required_document: Option<RequiredDocument>,
}

/// `GET /documents/{doc_id}` (spec §6.2): the document plus its joined
/// `context_entity`, `used_schema`, and `required_document` neighbors.
pub async fn show(
    State(ctx): State<Arc<AppContext>>,
    Path(doc_id): Path<String>,
) -> Result<Json<ApiResponse<DocumentDetail>>, AppError> {
    let raw = ctx
        .graph
        .get_vertex(dms_types::edges::DOCUMENTS, &doc_id)
        .await
        .map_err(from_graph)?
        .ok_or_else(|| AppError::NotFound(format!("document {doc_id}")))?;
    let document: Document = serde_json::from_value(raw).map_err(AppError::from)?;

    let context_entity = one_hop_neighbor::<EntityRef>(ctx.graph.as_ref(), &doc_id, FILE_LOCATED_IN, ENTITIES)
        .await
        .map_err(from_graph)?;
    let schema = one_hop_neighbor::<SchemaRefRow>(ctx.graph.as_ref(), &doc_id, USA_ESQUEMA, META_SCHEMAS)
        .await
        .map_err(from_graph)?
        .map(|s| SchemaRef { id: s.key, name: s.name, version: Some(s.version) });
    let required_document =
        one_hop_neighbor::<RequiredDocument>(ctx.graph.as_ref(), &doc_id, COMPLIES_WITH, REQUIRED_DOCUMENTS)
            .await
            .map_err(from_graph)?;

    Ok(Json(ApiResponse::ok(
        "ok",
        DocumentDetail {
            document,
            context_entity,
            used_schema: schema,
            required_document,
        },
    )))
}

#[derive(Debug, Deserialize)]
struct SchemaRefRow {
    #[serde(rename = "_key")]
    key: String,
    name: String,
    version: i64,
}

async fn one_hop_neighbor<T: serde::de::DeserializeOwned>(
    graph: &dyn GraphStore,
    doc_key: &str,
    edge_collection: &str,
    _target_collection: &str,
) -> Result<Option<T>, dms_graph::GraphError> {
    let handle = format!("{}/{doc_key}", dms_types::edges::DOCUMENTS);
    let chain = graph.traverse(&handle, 1, 1, Direction::Outbound, &[edge_collection]).await?;
    let neighbor = chain.into_iter().find(|v| v.get("_key").and_then(|k| k.as_str()) != Some(doc_key));
    Ok(neighbor.map(serde_json::from_value).transpose().unwrap_or(None))
}

#[derive(Debug, Deserialize)]
pub struct QualityCheckBody {
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// `POST /documents/{doc_id}/metadata/quality-check` (spec §4.6.1).
pub async fn quality_check(
    State(ctx): State<Arc<AppContext>>,
    Path(doc_id): Path<String>,
    Json(body): Json<QualityCheckBody>,
) -> Result<Json<ApiResponse<QualityCheckReport>>, AppError> {
    let report = dry_run_validation(ctx.graph.as_ref(), &doc_id, &body.metadata)
        .await
        .map_err(from_confirm)?;

    Ok(Json(ApiResponse::ok("ok", QualityCheckReport::from(report))))
}

#[derive(Debug, Serialize)]
pub struct QualityCheckReport {
    pub score: f64,
    pub is_ready: bool,
    pub fields_report: Vec<QualityCheckFieldReport>,
    pub summary_warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct QualityCheckFieldReport {
    pub key: String,
    pub label: String,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub actions: Vec<String>,
}

impl From<dms_confirm::ValidationReport> for QualityCheckReport {
    fn from(r: dms_confirm::ValidationReport) -> Self {
        QualityCheckReport {
            score: r.score,
            is_ready: r.is_ready,
            fields_report: r
                .fields_report
                .into_iter()
                .map(|f| QualityCheckFieldReport {
                    key: f.key,
                    label: f.label,
                    is_valid: f.is_valid,
                    warnings: f.warnings,
                    actions: f.actions,
                })
                .collect(),
            summary_warnings: r.summary_warnings,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConfirmBody {
    #[serde(default)]
    pub metadata: Map<String, Value>,
    pub display_name: Option<String>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub keep_original: bool,
}

/// `PATCH /documents/{doc_id}/metadata/confirm` (spec §4.6.2).
pub async fn confirm_document(
    State(ctx): State<Arc<AppContext>>,
    Extension(auth): Extension<AuthContext>,
    Path(doc_id): Path<String>,
    Json(body): Json<ConfirmBody>,
) -> Result<Json<ApiResponse<Document>>, AppError> {
    let directory = ctx.directory.as_ref();
    let resolver = IdentityResolver::new(ctx.graph.as_ref(), directory);
    let confirm_ctx = ConfirmContext {
        graph: ctx.graph.as_ref(),
        bucket: ctx.bucket.as_ref(),
        resolver: &resolver,
        integrity_secret: ctx.settings.document_integrity_secret.as_bytes(),
    };

    let request = ConfirmRequest {
        doc_id,
        caller_id: auth.user_id.clone(),
        metadata: body.metadata,
        display_name: body.display_name,
        is_public: body.is_public,
        keep_original: body.keep_original,
    };

    let document = confirm(&confirm_ctx, request).await.map_err(from_confirm)?;
    Ok(Json(ApiResponse::ok("document confirmed", document)))
}

/// `GET /documents/{doc_id}/integrity/verify` — not named in spec.md's
/// route table but described in full by §4.6.3; exposed here since a
/// confirmation engine capability with no HTTP surface at all would be
/// dead weight in the shell (SPEC_FULL carries every operation the
/// engine performs).
pub async fn verify_integrity(
    State(ctx): State<Arc<AppContext>>,
    Extension(auth): Extension<AuthContext>,
    Path(doc_id): Path<String>,
) -> Result<Json<ApiResponse<dms_types::IntegrityVerification>>, AppError> {
    let directory = ctx.directory.as_ref();
    let resolver = IdentityResolver::new(ctx.graph.as_ref(), directory);
    let confirm_ctx = ConfirmContext {
        graph: ctx.graph.as_ref(),
        bucket: ctx.bucket.as_ref(),
        resolver: &resolver,
        integrity_secret: ctx.settings.document_integrity_secret.as_bytes(),
    };

    let report = verify(&confirm_ctx, &doc_id, &auth.user_id).await.map_err(from_confirm)?;
    Ok(Json(ApiResponse::ok("ok", report)))
}

/// `GET /documents/required-documents/{required_document_id}/metadata-filters`
/// (SPEC_FULL §4 item 1, carried from `original_source/search/repository.py`).
pub async fn metadata_filters(
    State(ctx): State<Arc<AppContext>>,
    Path(required_document_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<dms_types::MetadataFilterOption>>>, AppError> {
    let options = metadata_filter_catalog(ctx.graph.as_ref(), &required_document_id)
        .await
        .map_err(from_search)?;
    Ok(Json(ApiResponse::ok("ok", options)))
}

/// `GET /documents/entities-with-documents` (SPEC_FULL §4 item 2).
pub async fn entities_with_documents(
    State(ctx): State<Arc<AppContext>>,
) -> Result<Json<ApiResponse<Vec<EntityRef>>>, AppError> {
    let entities = dms_search::entities_with_documents(ctx.graph.as_ref()).await.map_err(from_search)?;
    Ok(Json(ApiResponse::ok("ok", entities)))
}

#[derive(Debug, Deserialize)]
pub struct ProxyQuery {
    #[serde(default)]
    pub ip_address: Option<String>,
}

/// `GET /storage/proxy/{object_path:path}` (spec §4.7.6).
pub async fn storage_proxy(
    State(ctx): State<Arc<AppContext>>,
    Extension(auth): Extension<AuthContext>,
    Path(object_path): Path<String>,
    Query(query): Query<ProxyQuery>,
) -> Result<Response, AppError> {
    let document = resolve_document_by_storage_path(ctx.graph.as_ref(), ctx.settings.minio.bucket_name.as_str(), &object_path)
        .await
        .map_err(from_search)?
        .ok_or_else(|| AppError::NotFound("requested object".to_string()))?;

    let read_scopes = scopes_for(
        ctx.cache.as_ref(),
        &auth,
        &ctx.settings.dms_microservice_id,
        PERMISSION_READ,
        ctx.microservices_data.as_deref(),
    )
    .await;

    let allowed = authorize_download(ctx.graph.as_ref(), &document, &auth.user_id, &read_scopes)
        .await
        .map_err(from_search)?;
    if !allowed {
        return Err(AppError::Forbidden("caller cannot access this document's storage object".to_string()));
    }

    let stream = ctx
        .bucket
        .stream(&object_path)
        .await
        .map_err(|e| from_search(dms_search::SearchError::from(e)))?;
    let content_type = content_type_for_extension(&object_path);
    let disposition = content_disposition_inline(&object_path);

    ctx.audit_queue.enqueue(AuditDownloadRecord {
        document_id: document.key.clone(),
        user_id: auth.user_id.clone(),
        ip_address: query.ip_address,
        timestamp: chrono::Utc::now(),
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, disposition)
        .body(Body::from_stream(stream))
        .expect("a static header set always builds a valid response");

    Ok(response)
}
