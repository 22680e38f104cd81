//! Account entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Role, User, UserStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Columns selected for every `users` query.
pub const USER_COLUMNS: &str = "id, email, name, phone, password_hash, role, roles, status, \
     must_change_password, password_changed_at, two_factor_enabled, two_factor_secret, \
     two_factor_pending_secret, two_factor_backup_codes, last_login_at, created_at, updated_at";

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub password_hash: String,
    /// Resolved role, kept in sync with `roles` for indexing.
    pub role: String,
    pub roles: Vec<String>,
    pub status: String,
    pub must_change_password: bool,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub two_factor_enabled: bool,
    pub two_factor_secret: Option<String>,
    pub two_factor_pending_secret: Option<String>,
    /// SHA-256 hashes of unused backup codes.
    pub two_factor_backup_codes: Vec<String>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserEntity {
    pub fn resolved_role(&self) -> Role {
        Role::resolve(&self.roles)
    }

    /// Unknown status values are treated as blocked.
    pub fn user_status(&self) -> UserStatus {
        self.status.parse().unwrap_or(UserStatus::Blocked)
    }
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        let status = entity.user_status();
        Self {
            id: entity.id,
            email: entity.email,
            name: entity.name,
            phone: entity.phone,
            roles: entity.roles,
            status,
            must_change_password: entity.must_change_password,
            password_changed_at: entity.password_changed_at,
            two_factor_enabled: entity.two_factor_enabled,
            last_login_at: entity.last_login_at,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(roles: &[&str], status: &str) -> UserEntity {
        let now = Utc::now();
        UserEntity {
            id: Uuid::new_v4(),
            email: "obra@cc.com.br".into(),
            name: "Obra".into(),
            phone: None,
            password_hash: "$argon2id$...".into(),
            role: "cliente".into(),
            roles: roles.iter().map(|r| r.to_string()).collect(),
            status: status.into(),
            must_change_password: true,
            password_changed_at: None,
            two_factor_enabled: false,
            two_factor_secret: None,
            two_factor_pending_secret: None,
            two_factor_backup_codes: vec![],
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_into_domain_drops_secrets() {
        let user: User = entity(&["fornecedor"], "active").into();
        assert_eq!(user.role(), Role::Supplier);
        assert_eq!(user.status, UserStatus::Active);
        assert!(user.must_change_password);
    }

    #[test]
    fn test_unknown_status_is_blocked() {
        assert_eq!(entity(&[], "suspended").user_status(), UserStatus::Blocked);
    }
}
