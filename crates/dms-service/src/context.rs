//! Shared application dependencies, modeled on the teacher's
//! `control::context::AppContext`: one cheaply-cloneable struct carrying
//! every backend handle a handler might need, injected via axum's
//! `State` extractor rather than `Extension` (the teacher's axum 0.4
//! idiom; `State` is its axum 0.7+ successor).

use std::sync::Arc;

use dms_authz::{JwksCache, MicroservicesData, SessionCache};
use dms_config::Settings;
use dms_graph::GraphStore;
use dms_identity::DirectoryClient;
use dms_objectstore::ObjectBucket;

use crate::audit::AuditQueue;

#[derive(Clone)]
pub struct AppContext {
    pub graph: Arc<dyn GraphStore>,
    pub bucket: Arc<ObjectBucket>,
    pub cache: Arc<dyn SessionCache>,
    pub jwks: Arc<JwksCache>,
    pub directory: Arc<dyn DirectoryClient>,
    pub settings: &'static Settings,
    pub microservices_data: Option<Arc<MicroservicesData>>,
    pub audit_queue: AuditQueue,
}

impl AppContext {
    pub fn new(
        graph: Arc<dyn GraphStore>,
        bucket: ObjectBucket,
        cache: Arc<dyn SessionCache>,
        directory: Arc<dyn DirectoryClient>,
        settings: &'static Settings,
        microservices_data: Option<MicroservicesData>,
    ) -> Self {
        let audit_queue = AuditQueue::spawn(graph.clone());
        Self {
            graph,
            bucket: Arc::new(bucket),
            cache,
            jwks: Arc::new(JwksCache::new()),
            directory,
            settings,
            microservices_data: microservices_data.map(Arc::new),
            audit_queue,
        }
    }
}
