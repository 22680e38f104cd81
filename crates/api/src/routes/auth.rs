//! Session endpoints: login, logout, current account and password change.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use domain::models::audit_log::actions;
use domain::models::user::{ChangePasswordRequest, LoginRequest};
use domain::models::{AuditEntry, Role, User, UserSummary};
use domain::services::route_access::CHANGE_PASSWORD_PATH;
use persistence::entities::UserEntity;
use persistence::repositories::{ClientRepository, SupplierRepository, UserRepository};
use serde::Serialize;
use serde_json::json;
use shared::password::{hash_password, validate_password_strength, verify_password};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::middleware::enforce;
use crate::services::audit;
use crate::services::{AuthError, LoginOutcome};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user: UserSummary,
    pub role: Role,
    pub access_token: String,
    pub expires_in: i64,
    pub must_change_password: bool,
    pub redirect_to: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub user: UserSummary,
    pub role: Role,
    pub profile_id: Option<Uuid>,
    pub must_change_password: bool,
}

/// Page the client should open after signing in.
fn landing_path(role: Role, must_change_password: bool) -> &'static str {
    if must_change_password {
        CHANGE_PASSWORD_PATH
    } else {
        role.dashboard_path()
    }
}

fn summary(entity: UserEntity) -> UserSummary {
    User::from(entity).summary()
}

/// POST /api/auth/login
///
/// The body is parsed after the `login` window is charged, so unparseable
/// requests count against the limit like any other attempt.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    body: Bytes,
) -> Result<Response, ApiError> {
    enforce(&state, "login", &ip, state.config.rate_limit.login).await?;
    let request: LoginRequest = serde_json::from_slice(&body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e)))?;
    request.validate()?;

    let outcome = state
        .auth
        .login(&request.email, &request.password, request.totp_code.as_deref())
        .await;

    let (user, token) = match outcome {
        Ok(LoginOutcome::TwoFactorRequired) => {
            return Ok(Json(json!({ "requiresTwoFactor": true })).into_response());
        }
        Ok(LoginOutcome::Authenticated { user, token }) => (*user, token),
        Err(err) => {
            if matches!(
                err,
                AuthError::InvalidCredentials
                    | AuthError::InvalidTwoFactorCode
                    | AuthError::AccountDisabled(_)
            ) {
                audit::record(
                    &state.pool,
                    AuditEntry::new(actions::AUTH_LOGIN_FAILED, "user")
                        .with_details(json!({ "email": request.email.trim().to_lowercase(), "reason": err.to_string() }))
                        .from_ip(ip.clone()),
                )
                .await;
            }
            return Err(err.into());
        }
    };

    audit::record(
        &state.pool,
        AuditEntry::new(actions::AUTH_LOGIN, "user")
            .by(user.id, user.email.clone())
            .on(user.id)
            .from_ip(ip),
    )
    .await;

    let role = user.resolved_role();
    let must_change_password = user.must_change_password;
    let body = LoginResponse {
        role,
        access_token: token.access_token.clone(),
        expires_in: token.expires_in,
        must_change_password,
        redirect_to: landing_path(role, must_change_password).to_string(),
        user: summary(user),
    };

    let mut response = Json(body).into_response();
    state
        .cookies
        .add_token_cookie(response.headers_mut(), &token.access_token);
    Ok(response)
}

/// POST /api/auth/logout
///
/// Public so a browser holding a stale or invalid session can still clear it.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let mut response = Json(json!({ "success": true })).into_response();
    state
        .cookies
        .add_clear_cookies(&headers, response.headers_mut());
    response
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = UserRepository::new(state.pool.clone())
        .find_by_id(current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    let profile_id = match current.role {
        Role::Supplier => SupplierRepository::new(state.pool.clone())
            .find_by_user_id(user.id)
            .await?
            .map(|s| s.id),
        Role::Client => ClientRepository::new(state.pool.clone())
            .find_by_user_id(user.id)
            .await?
            .map(|c| c.id),
        Role::Admin => None,
    };

    Ok(Json(MeResponse {
        role: current.role,
        profile_id,
        must_change_password: user.must_change_password,
        user: summary(user),
    }))
}

/// POST /api/auth/change-password
///
/// Clears the forced-change flag and returns a fresh token that no longer
/// carries it, so the route guard lets the user into the dashboard.
pub async fn change_password(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<ChangePasswordRequest>,
) -> Result<Response, ApiError> {
    request.validate()?;
    validate_password_strength(&request.new_password).map_err(ApiError::Validation)?;
    if request.new_password == request.current_password {
        return Err(ApiError::Validation(
            "New password must differ from the current password".to_string(),
        ));
    }

    let repo = UserRepository::new(state.pool.clone());
    let user = repo
        .find_by_id(current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;

    let matches = verify_password(&request.current_password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    if !matches {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let hash = hash_password(&request.new_password).map_err(|e| ApiError::Internal(e.to_string()))?;
    if !repo.change_password(user.id, &hash).await? {
        return Err(ApiError::NotFound("Account not found".to_string()));
    }

    info!(user_id = %user.id, "Password changed");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::AUTH_PASSWORD_CHANGE, "user")
            .by(user.id, user.email.clone())
            .on(user.id)
            .from_ip(ip),
    )
    .await;

    let updated = repo
        .find_by_id(user.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))?;
    let token = state.auth.issue_token(&updated)?;
    let role = updated.resolved_role();

    let mut response = Json(json!({
        "success": true,
        "accessToken": token.access_token,
        "expiresIn": token.expires_in,
        "redirectTo": role.dashboard_path(),
    }))
    .into_response();
    state
        .cookies
        .add_token_cookie(response.headers_mut(), &token.access_token);
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_landing_path() {
        assert_eq!(landing_path(Role::Admin, false), "/dashboard/admin");
        assert_eq!(landing_path(Role::Client, false), "/dashboard/cliente");
        assert_eq!(landing_path(Role::Supplier, true), CHANGE_PASSWORD_PATH);
    }
}
