//! Client (cliente) profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A client profile, linked to an account through `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    /// CPF or CNPJ, digits only.
    pub document: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateClientRequest {
    #[validate(length(min = 1, max = 200, message = "Name must be between 1 and 200 characters"))]
    pub name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_document"))]
    pub document: Option<String>,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(max = 120, message = "City must be at most 120 characters"))]
    pub city: Option<String>,

    #[validate(custom(function = "shared::validation::validate_uf"))]
    pub uf: Option<String>,
}
