//! Out-of-scope route surface (spec §1, §6.2): catalog browsing, template
//! upload CRUD, and the master-data force-sync trigger are external
//! collaborators this crate only stubs the shape of, per SPEC_FULL §6.
//! Every one of these returns `501 Not Implemented` rather than `404`, so
//! the route table in spec §6.2 is fully present even though the bodies
//! are deliberately out of scope.

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct NotImplemented {
    success: bool,
    message: String,
}

async fn not_implemented(route: &'static str) -> (StatusCode, Json<NotImplemented>) {
    (
        StatusCode::NOT_IMPLEMENTED,
        Json(NotImplemented {
            success: false,
            message: format!("{route} is outside the document lifecycle engine's scope"),
        }),
    )
}

pub async fn catalog() -> (StatusCode, Json<NotImplemented>) {
    not_implemented("catalog browsing").await
}

pub async fn templates() -> (StatusCode, Json<NotImplemented>) {
    not_implemented("template upload CRUD").await
}

pub async fn force_sync() -> (StatusCode, Json<NotImplemented>) {
    not_implemented("master-data force-sync").await
}
