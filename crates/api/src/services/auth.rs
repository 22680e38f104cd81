//! Credential checks and access token issuance.

use std::sync::{Arc, OnceLock};

use persistence::entities::UserEntity;
use persistence::repositories::UserRepository;
use shared::jwt::{JwtConfig, JwtError, TokenSubject};
use shared::password::{hash_password, verify_password, PasswordError};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::services::two_factor::{self, TwoFactorError, TwoFactorService};

/// Verified against when the email is unknown, so both paths cost one Argon2 run.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

fn burn_password_check(password: &str) {
    let hash = DUMMY_HASH.get_or_init(|| hash_password("comprar-construir-dummy").ok());
    if let Some(hash) = hash {
        let _ = verify_password(password, hash);
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is {0}")]
    AccountDisabled(&'static str),

    #[error("Invalid two-factor code")]
    InvalidTwoFactorCode,

    #[error("Two-factor authentication is not enabled")]
    TwoFactorNotEnabled,

    #[error(transparent)]
    Jwt(#[from] JwtError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    TwoFactor(#[from] TwoFactorError),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials => ApiError::Unauthorized(err.to_string()),
            AuthError::InvalidTwoFactorCode => ApiError::Unauthorized(err.to_string()),
            AuthError::AccountDisabled(_) => ApiError::Forbidden(err.to_string()),
            AuthError::TwoFactorNotEnabled => ApiError::Validation(err.to_string()),
            AuthError::Database(e) => e.into(),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub jti: String,
    pub expires_in: i64,
}

#[derive(Debug)]
pub enum LoginOutcome {
    /// Password accepted but the account needs a TOTP or backup code.
    TwoFactorRequired,
    Authenticated {
        user: Box<UserEntity>,
        token: IssuedToken,
    },
}

#[derive(Clone)]
pub struct AuthService {
    users: UserRepository,
    jwt: Arc<JwtConfig>,
    two_factor: TwoFactorService,
}

impl AuthService {
    pub fn new(pool: PgPool, jwt: Arc<JwtConfig>, two_factor: TwoFactorService) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt,
            two_factor,
        }
    }

    pub fn issue_token(&self, user: &UserEntity) -> Result<IssuedToken, AuthError> {
        let role = user.resolved_role();
        let (access_token, jti) = self.jwt.generate_access_token(&TokenSubject {
            user_id: user.id,
            email: &user.email,
            role: role.as_str(),
            roles: &user.roles,
            must_change_password: user.must_change_password,
        })?;
        Ok(IssuedToken {
            access_token,
            jti,
            expires_in: self.jwt.access_token_expiry_secs,
        })
    }

    /// Email + password (+ second factor) login.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        totp_code: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let user = match self.users.find_by_email(email.trim()).await? {
            Some(user) => user,
            None => {
                burn_password_check(password);
                debug!("Login attempt for unknown email");
                return Err(AuthError::InvalidCredentials);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        let status = user.user_status();
        if !status.can_sign_in() {
            return Err(AuthError::AccountDisabled(status.as_str()));
        }

        if user.two_factor_enabled {
            let Some(code) = totp_code.map(str::trim).filter(|c| !c.is_empty()) else {
                return Ok(LoginOutcome::TwoFactorRequired);
            };
            if !self.check_second_factor(&user, code).await? {
                return Err(AuthError::InvalidTwoFactorCode);
            }
        }

        self.users.record_login(user.id).await?;
        let token = self.issue_token(&user)?;
        info!(user_id = %user.id, role = %user.resolved_role(), "User logged in");

        Ok(LoginOutcome::Authenticated {
            user: Box::new(user),
            token,
        })
    }

    /// Accepts a current TOTP code, or consumes a backup code.
    pub async fn check_second_factor(
        &self,
        user: &UserEntity,
        code: &str,
    ) -> Result<bool, AuthError> {
        let Some(secret) = user.two_factor_secret.as_deref() else {
            return Err(AuthError::TwoFactorNotEnabled);
        };

        if two_factor::is_backup_code_format(code) {
            let hash = two_factor::hash_backup_code(code);
            let consumed = self.users.consume_backup_code(user.id, &hash).await?;
            if consumed {
                info!(user_id = %user.id, "Backup code used");
            }
            return Ok(consumed);
        }

        Ok(self.two_factor.verify(secret, code)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_mapping() {
        use axum::http::StatusCode;
        let cases = [
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::InvalidTwoFactorCode, StatusCode::UNAUTHORIZED),
            (AuthError::AccountDisabled("blocked"), StatusCode::FORBIDDEN),
            (AuthError::TwoFactorNotEnabled, StatusCode::BAD_REQUEST),
            (
                AuthError::Jwt(JwtError::InvalidToken),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status(), status);
        }
    }

    #[test]
    fn test_unknown_email_check_never_matches() {
        burn_password_check("anything");
        let hash = DUMMY_HASH.get().cloned().flatten().unwrap();
        assert!(!verify_password("anything", &hash).unwrap());
    }

    #[test]
    fn test_account_disabled_message() {
        assert_eq!(
            AuthError::AccountDisabled("blocked").to_string(),
            "Account is blocked"
        );
    }
}
