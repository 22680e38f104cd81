//! Supplier (fornecedor) domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A supplier profile, linked to an account through `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Supplier {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub company_name: String,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
    pub active: bool,
    pub grupo_ids: Vec<Uuid>,
    pub material_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
    /// Existing account to link, if any.
    pub user_id: Option<Uuid>,

    #[validate(length(min = 1, max = 200, message = "Company name must be between 1 and 200 characters"))]
    pub company_name: String,

    #[validate(length(max = 200, message = "Trade name must be at most 200 characters"))]
    pub trade_name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_cnpj"))]
    pub cnpj: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 120, message = "City must be at most 120 characters"))]
    pub city: Option<String>,

    #[validate(custom(function = "shared::validation::validate_uf"))]
    pub uf: Option<String>,

    #[validate(custom(function = "shared::validation::validate_cep"))]
    pub cep: Option<String>,

    #[serde(default)]
    pub grupo_ids: Vec<Uuid>,

    #[serde(default)]
    pub material_ids: Vec<Uuid>,
}

/// Partial update. Link lists, when present, replace the current links.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 200, message = "Company name must be between 1 and 200 characters"))]
    pub company_name: Option<String>,

    #[validate(length(max = 200, message = "Trade name must be at most 200 characters"))]
    pub trade_name: Option<String>,

    #[validate(custom(function = "shared::validation::validate_cnpj"))]
    pub cnpj: Option<String>,

    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,

    #[validate(custom(function = "shared::validation::validate_phone"))]
    pub phone: Option<String>,

    #[validate(length(max = 300, message = "Address must be at most 300 characters"))]
    pub address: Option<String>,

    #[validate(length(max = 120, message = "City must be at most 120 characters"))]
    pub city: Option<String>,

    #[validate(custom(function = "shared::validation::validate_uf"))]
    pub uf: Option<String>,

    #[validate(custom(function = "shared::validation::validate_cep"))]
    pub cep: Option<String>,

    pub active: Option<bool>,

    pub grupo_ids: Option<Vec<Uuid>>,

    pub material_ids: Option<Vec<Uuid>>,
}

/// Normalized column values shared by create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SupplierFields {
    pub cnpj: Option<String>,
    pub uf: Option<String>,
    pub cep: Option<String>,
}

impl SupplierFields {
    /// CNPJ and CEP are stored as bare digits, UF upper-cased.
    pub fn normalize(cnpj: Option<&str>, uf: Option<&str>, cep: Option<&str>) -> Self {
        Self {
            cnpj: cnpj.map(shared::validation::normalize_digits),
            uf: uf.map(|u| u.trim().to_uppercase()),
            cep: cep.and_then(shared::validation::normalize_cep),
        }
    }
}

/// Query filters for supplier listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierFilter {
    pub search: Option<String>,
    pub grupo_id: Option<Uuid>,
    pub uf: Option<String>,
    pub active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_supplier_valid() {
        let req: CreateSupplierRequest = serde_json::from_value(serde_json::json!({
            "companyName": "Madeireira Paulista Ltda",
            "cnpj": "11.222.333/0001-81",
            "uf": "sp",
            "cep": "01310-100",
            "grupoIds": [Uuid::new_v4()]
        }))
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.grupo_ids.len(), 1);
        assert!(req.material_ids.is_empty());
    }

    #[test]
    fn test_create_supplier_rejects_bad_fields() {
        let req: CreateSupplierRequest = serde_json::from_value(serde_json::json!({
            "companyName": "",
            "cnpj": "123",
            "uf": "ZZ",
            "cep": "123"
        }))
        .unwrap();
        let errors = req.validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["company_name", "cnpj", "uf", "cep"] {
            assert!(fields.contains_key(field), "missing error for {}", field);
        }
    }

    #[test]
    fn test_normalize_fields() {
        let fields =
            SupplierFields::normalize(Some("11.222.333/0001-81"), Some(" rj "), Some("20040-002"));
        assert_eq!(fields.cnpj.as_deref(), Some("11222333000181"));
        assert_eq!(fields.uf.as_deref(), Some("RJ"));
        assert_eq!(fields.cep.as_deref(), Some("20040002"));
    }

    #[test]
    fn test_update_links_absent_vs_empty() {
        let absent: UpdateSupplierRequest = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(absent.grupo_ids.is_none());
        let empty: UpdateSupplierRequest =
            serde_json::from_value(serde_json::json!({"grupoIds": []})).unwrap();
        assert_eq!(empty.grupo_ids, Some(vec![]));
    }
}
