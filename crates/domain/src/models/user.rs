//! Account domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use super::role::Role;

/// Account lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Active,
    Inactive,
    Blocked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Blocked => "blocked",
        }
    }

    /// Only active accounts may authenticate.
    pub fn can_sign_in(&self) -> bool {
        matches!(self, UserStatus::Active)
    }
}

impl FromStr for UserStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" | "ativo" => Ok(UserStatus::Active),
            "inactive" | "inativo" => Ok(UserStatus::Inactive),
            "blocked" | "bloqueado" => Ok(UserStatus::Blocked),
            _ => Err(format!("Invalid user status: {}", s)),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An account, without credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub roles: Vec<String>,
    pub status: UserStatus,
    pub must_change_password: bool,
    pub password_changed_at: Option<DateTime<Utc>>,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn role(&self) -> Role {
        Role::resolve(&self.roles)
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
            phone: self.phone.clone(),
            role: self.role(),
            status: self.status,
            must_change_password: self.must_change_password,
            two_factor_enabled: self.two_factor_enabled,
            last_login_at: self.last_login_at,
            created_at: self.created_at,
        }
    }
}

/// Account as returned by listings and `/api/auth/me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub status: UserStatus,
    pub must_change_password: bool,
    pub two_factor_enabled: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Admin request to create an account.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAccountRequest {
    #[validate(email(message = "Invalid email address"))]
    #[validate(length(max = 255, message = "Email must be at most 255 characters"))]
    pub email: String,

    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: String,

    pub role: Role,

    /// When absent a temporary password is generated.
    pub password: Option<String>,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(min = 1, max = 200, message = "Company must be between 1 and 200 characters"))]
    pub company: Option<String>,

    #[validate(custom(function = "shared::validation::validate_cnpj"))]
    pub cnpj: Option<String>,

    /// CPF or CNPJ of a client account.
    #[validate(custom(function = "shared::validation::validate_document"))]
    pub document: Option<String>,
}

impl CreateAccountRequest {
    pub fn normalized_email(&self) -> String {
        self.email.trim().to_lowercase()
    }

    /// Company name stored on the supplier profile.
    pub fn company_name(&self) -> &str {
        self.company.as_deref().unwrap_or(&self.name)
    }
}

/// Admin request to update an account.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAccountRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: Option<String>,

    pub role: Option<Role>,

    pub status: Option<UserStatus>,
}

impl UpdateAccountRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.phone.is_none() && self.role.is_none() && self.status.is_none()
    }
}

/// Admin request to reset an account password.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub new_password: Option<String>,
}

/// Response for account creation and admin password reset.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountCreatedResponse {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 128, message = "Password is required"))]
    pub password: String,

    #[validate(length(min = 6, max = 16, message = "Invalid two-factor code"))]
    pub totp_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[validate(length(min = 1, message = "Current password is required"))]
    pub current_password: String,

    pub new_password: String,
}

/// Query filters for the admin user listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFilter {
    pub role: Option<Role>,
    pub status: Option<UserStatus>,
    /// Case-insensitive match on email or name.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use fake::faker::internet::en::SafeEmail;
    use fake::faker::name::en::Name;
    use fake::Fake;

    fn create_request(json: serde_json::Value) -> CreateAccountRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_user_status_from_str() {
        assert_eq!("active".parse::<UserStatus>().unwrap(), UserStatus::Active);
        assert_eq!("Bloqueado".parse::<UserStatus>().unwrap(), UserStatus::Blocked);
        assert!("deleted".parse::<UserStatus>().is_err());
        assert!(UserStatus::Active.can_sign_in());
        assert!(!UserStatus::Inactive.can_sign_in());
    }

    #[test]
    fn test_create_account_request_valid() {
        let email: String = SafeEmail().fake();
        let name: String = Name().fake();
        let req = create_request(serde_json::json!({
            "email": email,
            "name": name,
            "role": "fornecedor",
            "company": "Casa do Cimento Ltda",
            "cnpj": "11.222.333/0001-81",
            "phone": "(11) 98765-4321"
        }));
        assert!(req.validate().is_ok());
        assert_eq!(req.role, Role::Supplier);
        assert_eq!(req.company_name(), "Casa do Cimento Ltda");
    }

    #[test]
    fn test_create_account_request_invalid_cnpj() {
        let req = create_request(serde_json::json!({
            "email": "vendas@cimento.com.br",
            "name": "Casa do Cimento",
            "role": "fornecedor",
            "cnpj": "11.222.333/0001-00"
        }));
        let errors = req.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("cnpj"));
    }

    #[test]
    fn test_create_account_request_invalid_email() {
        let req = create_request(serde_json::json!({
            "email": "not-an-email",
            "name": "Obra Certa",
            "role": "cliente"
        }));
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_create_account_request_unknown_role_rejected() {
        let result: Result<CreateAccountRequest, _> = serde_json::from_value(serde_json::json!({
            "email": "a@b.com",
            "name": "X",
            "role": "superuser"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_normalized_email_and_company_fallback() {
        let req = create_request(serde_json::json!({
            "email": "  Compras@Obra.COM ",
            "name": "Obra Certa",
            "role": "cliente"
        }));
        assert_eq!(req.normalized_email(), "compras@obra.com");
        assert_eq!(req.company_name(), "Obra Certa");
    }

    #[test]
    fn test_update_request_is_empty() {
        assert!(UpdateAccountRequest::default().is_empty());
        let req: UpdateAccountRequest =
            serde_json::from_value(serde_json::json!({"status": "blocked"})).unwrap();
        assert!(!req.is_empty());
        assert_eq!(req.status, Some(UserStatus::Blocked));
    }

    #[test]
    fn test_summary_resolves_role() {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: "admin@cc.com.br".into(),
            name: "Admin".into(),
            phone: None,
            roles: vec!["cliente".into(), "admin".into()],
            status: UserStatus::Active,
            must_change_password: false,
            password_changed_at: None,
            two_factor_enabled: false,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let summary = user.summary();
        assert_eq!(summary.role, Role::Admin);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["mustChangePassword"], false);
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_account_created_response_omits_missing_password() {
        let response = AccountCreatedResponse {
            id: Uuid::nil(),
            email: "a@b.com".into(),
            role: Role::Client,
            temporary_password: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("temporaryPassword").is_none());
    }
}
