//! Authenticated account extractor.
//!
//! Resolves the access token (Authorization header first, then auth cookies),
//! validates it, and reloads the account so role and status changes take
//! effect immediately rather than at token expiry.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts, http::HeaderMap};
use domain::models::{Role, UserStatus};
use persistence::repositories::UserRepository;
use shared::jwt::JwtError;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::services::token::{resolve_token, TokenSource};

#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub roles: Vec<String>,
    pub status: UserStatus,
    pub must_change_password: bool,
    pub token_source: TokenSource,
}

impl CurrentUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Fails with 403 unless the account has `role`. Admins always pass.
    pub fn require_role(&self, role: Role) -> Result<(), ApiError> {
        if self.role.satisfies(role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!("{} role required", role)))
        }
    }

    pub fn require_any_role(&self, roles: &[Role]) -> Result<(), ApiError> {
        if self.is_admin() || roles.contains(&self.role) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Insufficient role".to_string()))
        }
    }

    /// Runs the full auth gate against request headers.
    pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<Self, ApiError> {
        let resolved = resolve_token(headers, true)
            .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

        let claims = state
            .jwt
            .validate_access_token(&resolved.token)
            .map_err(|e| match e {
                JwtError::TokenExpired => ApiError::Unauthorized("Token expired".to_string()),
                _ => ApiError::Unauthorized("Invalid token".to_string()),
            })?;
        let user_id = claims
            .user_id()
            .map_err(|_| ApiError::Unauthorized("Invalid token".to_string()))?;

        let user = UserRepository::new(state.pool.clone())
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("Account not found".to_string()))?;

        let status = user.user_status();
        if !status.can_sign_in() {
            return Err(ApiError::Forbidden(format!("Account is {}", status)));
        }

        tracing::debug!(
            user_id = %user.id,
            source = resolved.source.as_str(),
            "Request authenticated"
        );

        Ok(Self {
            user_id: user.id,
            role: user.resolved_role(),
            status,
            must_change_password: user.must_change_password,
            email: user.email,
            name: user.name,
            roles: user.roles,
            token_source: resolved.source,
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by require_auth / require_admin.
        if let Some(user) = parts.extensions.get::<CurrentUser>() {
            return Ok(user.clone());
        }
        CurrentUser::authenticate(state, &parts.headers).await
    }
}
