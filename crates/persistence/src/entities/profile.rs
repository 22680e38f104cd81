//! Supplier and client profile entities.

use chrono::{DateTime, Utc};
use domain::models::{Client, Supplier};
use sqlx::FromRow;
use uuid::Uuid;

pub const SUPPLIER_COLUMNS: &str = "f.id, f.user_id, f.company_name, f.trade_name, f.cnpj, f.email, \
     f.phone, f.address, f.city, f.uf, f.cep, f.active, f.created_at, f.updated_at, \
     COALESCE((SELECT array_agg(fg.grupo_id) FROM fornecedor_grupo fg WHERE fg.fornecedor_id = f.id), '{}') AS grupo_ids, \
     COALESCE((SELECT array_agg(fm.material_id) FROM fornecedor_materiais fm WHERE fm.fornecedor_id = f.id), '{}') AS material_ids";

/// Row of `fornecedores` with its link arrays aggregated.
#[derive(Debug, Clone, FromRow)]
pub struct SupplierEntity {
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub grupo_ids: Vec<Uuid>,
    pub material_ids: Vec<Uuid>,
}

impl From<SupplierEntity> for Supplier {
    fn from(e: SupplierEntity) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            company_name: e.company_name,
            trade_name: e.trade_name,
            cnpj: e.cnpj,
            email: e.email,
            phone: e.phone,
            address: e.address,
            city: e.city,
            uf: e.uf,
            cep: e.cep,
            active: e.active,
            grupo_ids: e.grupo_ids,
            material_ids: e.material_ids,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ClientEntity {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub document: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub uf: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ClientEntity> for Client {
    fn from(e: ClientEntity) -> Self {
        Self {
            id: e.id,
            user_id: e.user_id,
            name: e.name,
            document: e.document,
            phone: e.phone,
            city: e.city,
            uf: e.uf,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
