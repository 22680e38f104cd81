//! Authentication middleware.
//!
//! Runs the auth gate once per request and stores the [`CurrentUser`] in
//! request extensions for downstream handlers and middleware.

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

/// Requires a valid token for an existing, active account.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    match CurrentUser::authenticate(&state, req.headers()).await {
        Ok(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        Err(err) => err.into_response(),
    }
}

/// Like [`require_auth`] but the resolved role must be admin.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let user = match CurrentUser::authenticate(&state, req.headers()).await {
        Ok(user) => user,
        Err(err) => return err.into_response(),
    };

    if !user.is_admin() {
        tracing::warn!(
            user_id = %user.user_id,
            role = %user.role,
            path = %req.uri().path(),
            "Admin route denied"
        );
        return ApiError::Forbidden("Admin role required".to_string()).into_response();
    }

    req.extensions_mut().insert(user);
    next.run(req).await
}
