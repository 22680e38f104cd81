//! Quote, proposal and order entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::{
    Order, OrderStatus, PaymentStatus, Proposal, ProposalStatus, Quote, QuoteItem, QuoteStatus,
};
use sqlx::FromRow;
use uuid::Uuid;

pub const QUOTE_COLUMNS: &str = "c.id, c.client_user_id, c.grupo_id, c.title, c.description, \
     c.delivery_city, c.delivery_uf, c.deadline, c.status, c.created_at, c.updated_at, \
     (SELECT COUNT(*) FROM propostas p WHERE p.cotacao_id = c.id) AS proposal_count";

#[derive(Debug, Clone, FromRow)]
pub struct QuoteEntity {
    pub id: Uuid,
    pub client_user_id: Uuid,
    pub grupo_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_uf: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub proposal_count: i64,
}

impl QuoteEntity {
    pub fn quote_status(&self) -> QuoteStatus {
        self.status.parse().unwrap_or(QuoteStatus::Closed)
    }

    /// Builds the domain quote with its items.
    pub fn into_quote(self, items: Vec<QuoteItemEntity>) -> Quote {
        let status = self.quote_status();
        Quote {
            id: self.id,
            client_user_id: self.client_user_id,
            grupo_id: self.grupo_id,
            title: self.title,
            description: self.description,
            delivery_city: self.delivery_city,
            delivery_uf: self.delivery_uf,
            deadline: self.deadline,
            status,
            items: items.into_iter().map(Into::into).collect(),
            proposal_count: self.proposal_count,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct QuoteItemEntity {
    pub id: Uuid,
    pub cotacao_id: Uuid,
    pub material_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
}

impl From<QuoteItemEntity> for QuoteItem {
    fn from(e: QuoteItemEntity) -> Self {
        Self {
            id: e.id,
            material_id: e.material_id,
            description: e.description,
            quantity: e.quantity,
            unit: e.unit,
        }
    }
}

pub const PROPOSAL_COLUMNS: &str = "p.id, p.cotacao_id, p.fornecedor_id, f.company_name AS supplier_name, \
     p.total_cents, p.delivery_days, p.valid_until, p.notes, p.status, p.created_at, p.updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct ProposalEntity {
    pub id: Uuid,
    pub cotacao_id: Uuid,
    pub fornecedor_id: Uuid,
    pub supplier_name: Option<String>,
    pub total_cents: i64,
    pub delivery_days: i32,
    pub valid_until: Option<NaiveDate>,
    pub notes: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProposalEntity> for Proposal {
    fn from(e: ProposalEntity) -> Self {
        Self {
            id: e.id,
            quote_id: e.cotacao_id,
            supplier_id: e.fornecedor_id,
            supplier_name: e.supplier_name,
            total_cents: e.total_cents,
            delivery_days: e.delivery_days,
            valid_until: e.valid_until,
            notes: e.notes,
            status: e.status.parse().unwrap_or(ProposalStatus::Rejected),
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}

pub const ORDER_COLUMNS: &str = "id, cotacao_id, proposta_id, client_user_id, fornecedor_id, \
     total_cents, status, payment_status, payment_reference, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct OrderEntity {
    pub id: Uuid,
    pub cotacao_id: Uuid,
    pub proposta_id: Uuid,
    pub client_user_id: Uuid,
    pub fornecedor_id: Uuid,
    pub total_cents: i64,
    pub status: String,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<OrderEntity> for Order {
    fn from(e: OrderEntity) -> Self {
        Self {
            id: e.id,
            quote_id: e.cotacao_id,
            proposal_id: e.proposta_id,
            client_user_id: e.client_user_id,
            supplier_id: e.fornecedor_id,
            total_cents: e.total_cents,
            status: e.status.parse().unwrap_or(OrderStatus::Cancelled),
            payment_status: e.payment_status.parse().unwrap_or(PaymentStatus::Pending),
            payment_reference: e.payment_reference,
            created_at: e.created_at,
            updated_at: e.updated_at,
        }
    }
}
