//! Bearer-token auth layer (spec §4.7.1), generalized from the teacher's
//! `control::middleware::sessions::validate_authentication_token`: pull
//! the token off the request, resolve it into an `AuthContext`, and stash
//! it in the request extensions for handlers to pick up.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use dms_authz::{resolve_auth_context, AuthContext, JwksEndpoints};

use crate::context::AppContext;
use crate::error::{from_authz, AppError};

/// Extracts `Authorization: Bearer <token>`, resolves it through
/// `dms-authz`, and inserts the resulting `AuthContext` as a request
/// extension. Handlers pull it back out with `Extension<AuthContext>`.
pub async fn require_auth_context(
    State(ctx): State<Arc<AppContext>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let bearer_token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .unwrap_or_default();

    let auth_context: AuthContext = resolve_auth_context(
        ctx.cache.as_ref(),
        ctx.jwks.as_ref(),
        ctx.graph.clone(),
        JwksEndpoints {
            azure_tenant_id: &ctx.settings.azure.tenant_id,
            local_jwks_url: &ctx.settings.auth.jwks_url,
        },
        bearer_token,
    )
    .await
    .map_err(from_authz)?;

    request.extensions_mut().insert(auth_context);

    Ok(next.run(request).await.into_response())
}
