//! Liveness probe, generalized from the teacher's own
//! `control::controllers::health_check` (a DB ping there; here a graph
//! vertex read, since Arango — not Postgres — is this service's store).

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use dms_types::edges::META_SCHEMAS;

use crate::context::AppContext;

#[derive(Debug, Serialize)]
pub struct HealthCheck {
    current_time: DateTime<Utc>,
    graph_ping_seconds: Option<f64>,
}

pub async fn show(State(ctx): State<Arc<AppContext>>) -> Json<HealthCheck> {
    let start = Instant::now();
    let ping = ctx.graph.get_vertex(META_SCHEMAS, "__healthcheck__").await;
    let graph_ping_seconds = ping.ok().map(|_| duration_to_seconds(Instant::now() - start));

    Json(HealthCheck {
        current_time: Utc::now(),
        graph_ping_seconds,
    })
}

fn duration_to_seconds(d: Duration) -> f64 {
    d.as_secs_f64()
}
