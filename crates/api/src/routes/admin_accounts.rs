//! Admin account management: create, update, delete, reset password.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::audit_log::actions;
use domain::models::user::{
    AccountCreatedResponse, CreateAccountRequest, ResetPasswordRequest, UpdateAccountRequest,
};
use domain::models::{AuditEntry, Role, User};
use persistence::repositories::{NewAccount, UserRepository};
use serde_json::json;
use shared::password::{generate_temporary_password, hash_password, validate_password_strength};
use shared::validation::normalize_digits;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::middleware::enforce;
use crate::services::audit;

/// Chosen password after policy checks, or a generated one.
/// The flag is true when the password was generated.
fn choose_password(requested: Option<&str>) -> Result<(String, bool), ApiError> {
    match requested.map(str::trim).filter(|p| !p.is_empty()) {
        Some(password) => {
            validate_password_strength(password).map_err(ApiError::Validation)?;
            Ok((password.to_string(), false))
        }
        None => Ok((generate_temporary_password(), true)),
    }
}

fn hash(password: &str) -> Result<String, ApiError> {
    hash_password(password).map_err(|e| ApiError::Internal(e.to_string()))
}

/// POST /api/admin/accounts
///
/// Creates the account and its role profile in one transaction. The new
/// account must change its password on first login.
pub async fn create_account(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateAccountRequest>,
) -> Result<Json<AccountCreatedResponse>, ApiError> {
    request.validate()?;

    let email = request.normalized_email();
    let repo = UserRepository::new(state.pool.clone());
    if repo.find_by_email(&email).await?.is_some() {
        return Err(ApiError::Conflict(
            "An account with this email already exists".to_string(),
        ));
    }

    let (password, generated) = choose_password(request.password.as_deref())?;
    let password_hash = hash(&password)?;

    let phone = request.phone.as_deref().map(normalize_digits);
    let cnpj = request.cnpj.as_deref().map(normalize_digits);
    let document = request.document.as_deref().map(normalize_digits);

    let created = repo
        .create_account(&NewAccount {
            email: &email,
            name: request.name.trim(),
            phone: phone.as_deref(),
            password_hash: &password_hash,
            role: request.role,
            must_change_password: true,
            company_name: (request.role == Role::Supplier).then(|| request.company_name()),
            cnpj: cnpj.as_deref(),
            document: document.as_deref(),
        })
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => {
                ApiError::Conflict("Email or CNPJ already registered".to_string())
            }
            other => other,
        })?;

    let user = created.user;
    info!(
        admin_id = %admin.user_id,
        user_id = %user.id,
        role = %request.role,
        "Account created"
    );

    audit::record(
        &state.pool,
        AuditEntry::new(actions::ACCOUNT_CREATE, "user")
            .by(admin.user_id, admin.email.clone())
            .on(user.id)
            .with_details(json!({
                "email": user.email,
                "role": request.role.as_str(),
                "profileId": created.profile_id,
            }))
            .from_ip(ip),
    )
    .await;

    let message = state.email.account_created(
        &user.email,
        &user.name,
        generated.then_some(password.as_str()),
    );
    state.email.send_in_background(message);

    Ok(Json(AccountCreatedResponse {
        id: user.id,
        email: user.email,
        role: request.role,
        temporary_password: generated.then_some(password),
    }))
}

/// PUT /api/admin/accounts/:id
pub async fn update_account(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAccountRequest>,
) -> Result<Json<User>, ApiError> {
    request.validate()?;
    if request.is_empty() {
        return Err(ApiError::Validation("No fields to update".to_string()));
    }
    if id == admin.user_id && (request.role.is_some() || request.status.is_some()) {
        return Err(ApiError::Validation(
            "Admins cannot change their own role or status".to_string(),
        ));
    }

    let phone = request.phone.as_deref().map(normalize_digits);
    let updated = UserRepository::new(state.pool.clone())
        .update_account(
            id,
            request.name.as_deref().map(str::trim),
            phone.as_deref(),
            request.role,
            request.status,
        )
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(admin_id = %admin.user_id, user_id = %id, "Account updated");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::ACCOUNT_UPDATE, "user")
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .with_details(json!({
                "name": request.name,
                "role": request.role.map(|r| r.as_str()),
                "status": request.status.map(|s| s.as_str()),
            }))
            .from_ip(ip),
    )
    .await;

    Ok(Json(updated.into()))
}

/// DELETE /api/admin/accounts/:id
pub async fn delete_account(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if id == admin.user_id {
        return Err(ApiError::Validation(
            "You cannot delete your own account".to_string(),
        ));
    }

    let deleted = UserRepository::new(state.pool.clone())
        .delete(id)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::NotFound(_) => ApiError::Conflict(
                "Account is referenced by orders and cannot be deleted".to_string(),
            ),
            other => other,
        })?;
    if !deleted {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(admin_id = %admin.user_id, user_id = %id, "Account deleted");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::ACCOUNT_DELETE, "user")
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .from_ip(ip),
    )
    .await;

    Ok(Json(json!({ "success": true })))
}

/// POST /api/admin/accounts/:id/reset-password
///
/// Always forces a password change on next login and clears
/// `password_changed_at`. Limited per admin by the `password_reset` policy.
pub async fn reset_password(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    request: Option<Json<ResetPasswordRequest>>,
) -> Result<Json<AccountCreatedResponse>, ApiError> {
    enforce(
        &state,
        "password_reset",
        &admin.user_id.to_string(),
        state.config.rate_limit.password_reset,
    )
    .await?;

    let requested = request.and_then(|Json(r)| r.new_password);
    let (password, generated) = choose_password(requested.as_deref())?;
    let password_hash = hash(&password)?;

    let repo = UserRepository::new(state.pool.clone());
    if !repo.reset_password(id, &password_hash).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }
    let user = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    info!(admin_id = %admin.user_id, user_id = %id, "Password reset by admin");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::ACCOUNT_PASSWORD_RESET, "user")
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .with_details(json!({ "generated": generated }))
            .from_ip(ip),
    )
    .await;

    let message = state.email.password_reset(
        &user.email,
        &user.name,
        generated.then_some(password.as_str()),
    );
    state.email.send_in_background(message);

    Ok(Json(AccountCreatedResponse {
        id: user.id,
        role: user.resolved_role(),
        email: user.email,
        temporary_password: generated.then_some(password),
    }))
}
