use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use tower::ServiceExt;

use dms_authz::{InMemorySessionCache, SessionCache};
use dms_config::{ApplicationSettings, ArangoSettings, AuthSettings, AzureSettings, KafkaSettings, MinioSettings, Settings};
use dms_graph::{GraphStore, InMemoryGraphStore};
use dms_identity::{DirectoryClient, InMemoryDirectoryClient};
use dms_objectstore::ObjectBucket;
use dms_service::context::AppContext;
use dms_service::routes::routes;

fn test_settings() -> &'static Settings {
    Box::leak(Box::new(Settings {
        application: ApplicationSettings { host: "127.0.0.1".to_string(), port: 0 },
        arango: ArangoSettings {
            host_url: "http://localhost:8529".to_string(),
            root_password: "test".to_string(),
            db_name: "dms_test".to_string(),
        },
        minio: MinioSettings {
            endpoint: "http://localhost:9000".to_string(),
            root_user: "test".to_string(),
            root_password: "test".to_string(),
            bucket_name: "dms-test".to_string(),
            secure: false,
        },
        kafka: KafkaSettings { bootstrap_servers: "localhost:9092".to_string() },
        azure: AzureSettings {
            tenant_id: "test-tenant".to_string(),
            client_id: "test-client".to_string(),
            client_secret: "test-secret".to_string(),
        },
        auth: AuthSettings {
            redis_url: "redis://localhost:6379".to_string(),
            jwks_url: "http://localhost/jwks".to_string(),
        },
        dms_microservice_id: "test-dms".to_string(),
        document_integrity_secret: "test-integrity-secret".to_string(),
    }))
}

fn test_context() -> Arc<AppContext> {
    let graph: Arc<dyn GraphStore> = Arc::new(InMemoryGraphStore::new());
    let bucket = ObjectBucket::in_memory("dms-test");
    let cache: Arc<dyn SessionCache> = Arc::new(InMemorySessionCache::new());
    let directory: Arc<dyn DirectoryClient> = Arc::new(InMemoryDirectoryClient { users: Vec::new() });

    Arc::new(AppContext::new(graph, bucket, cache, directory, test_settings(), None))
}

#[tokio::test]
async fn health_check_reports_ok_without_authentication() {
    let app = routes(test_context());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn documents_route_is_forbidden_without_a_bearer_token() {
    let app = routes(test_context());

    let response = app
        .oneshot(Request::builder().uri("/documents").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn out_of_scope_routes_return_not_implemented() {
    let app = routes(test_context());

    let response = app
        .oneshot(Request::builder().uri("/catalog/anything").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn force_sync_stub_returns_not_implemented() {
    let app = routes(test_context());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/force-sync")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
}
