//! TOTP enrollment for the signed-in account.

use axum::{extract::State, Json};
use domain::models::audit_log::actions;
use domain::models::AuditEntry;
use persistence::entities::UserEntity;
use persistence::repositories::UserRepository;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::services::audit;
use crate::services::two_factor::{generate_backup_codes, hash_backup_code, TwoFactorSetup};

#[derive(Debug, Deserialize)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnableResponse {
    pub enabled: bool,
    /// Shown once; only hashes are stored.
    pub backup_codes: Vec<String>,
}

async fn load_account(state: &AppState, current: &CurrentUser) -> Result<UserEntity, ApiError> {
    UserRepository::new(state.pool.clone())
        .find_by_id(current.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
}

fn internal(e: impl std::fmt::Display) -> ApiError {
    ApiError::Internal(e.to_string())
}

/// POST /api/auth/2fa/setup
///
/// Stores a pending secret; nothing changes for login until `enable`
/// confirms a code generated from it.
pub async fn setup(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<TwoFactorSetup>, ApiError> {
    let user = load_account(&state, &current).await?;
    if user.two_factor_enabled {
        return Err(ApiError::Conflict(
            "Two-factor authentication is already enabled".to_string(),
        ));
    }

    let setup = state
        .two_factor
        .generate_setup(&user.email)
        .map_err(internal)?;
    UserRepository::new(state.pool.clone())
        .set_pending_two_factor(user.id, &setup.secret)
        .await?;

    Ok(Json(setup))
}

/// POST /api/auth/2fa/enable
pub async fn enable(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<CodeRequest>,
) -> Result<Json<EnableResponse>, ApiError> {
    let user = load_account(&state, &current).await?;
    if user.two_factor_enabled {
        return Err(ApiError::Conflict(
            "Two-factor authentication is already enabled".to_string(),
        ));
    }
    let secret = user.two_factor_pending_secret.as_deref().ok_or_else(|| {
        ApiError::Validation("Run two-factor setup before enabling it".to_string())
    })?;

    if !state
        .two_factor
        .verify(secret, &request.code)
        .map_err(internal)?
    {
        return Err(ApiError::Validation("Invalid two-factor code".to_string()));
    }

    let backup_codes = generate_backup_codes();
    let hashes: Vec<String> = backup_codes.iter().map(|c| hash_backup_code(c)).collect();
    UserRepository::new(state.pool.clone())
        .enable_two_factor(user.id, secret, &hashes)
        .await?;

    info!(user_id = %user.id, "Two-factor authentication enabled");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::TWO_FACTOR_ENABLE, "user")
            .by(user.id, user.email.clone())
            .on(user.id)
            .from_ip(ip),
    )
    .await;

    Ok(Json(EnableResponse {
        enabled: true,
        backup_codes,
    }))
}

/// POST /api/auth/2fa/disable
///
/// Requires a current TOTP code or an unused backup code.
pub async fn disable(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<CodeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let user = load_account(&state, &current).await?;
    if !user.two_factor_enabled {
        return Err(ApiError::Validation(
            "Two-factor authentication is not enabled".to_string(),
        ));
    }

    if !state.auth.check_second_factor(&user, request.code.trim()).await? {
        return Err(ApiError::Unauthorized("Invalid two-factor code".to_string()));
    }

    UserRepository::new(state.pool.clone())
        .disable_two_factor(user.id)
        .await?;

    info!(user_id = %user.id, "Two-factor authentication disabled");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::TWO_FACTOR_DISABLE, "user")
            .by(user.id, user.email.clone())
            .on(user.id)
            .from_ip(ip),
    )
    .await;

    Ok(Json(serde_json::json!({ "enabled": false })))
}
