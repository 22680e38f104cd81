//! Quote (cotação) domain models.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Lifecycle of a quote request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuoteStatus {
    /// Waiting for proposals.
    Open,
    /// At least one proposal received.
    Responded,
    /// A proposal was accepted.
    Closed,
    Cancelled,
    /// Deadline passed without an accepted proposal.
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Open => "open",
            QuoteStatus::Responded => "responded",
            QuoteStatus::Closed => "closed",
            QuoteStatus::Cancelled => "cancelled",
            QuoteStatus::Expired => "expired",
        }
    }

    pub fn accepts_proposals(&self) -> bool {
        matches!(self, QuoteStatus::Open | QuoteStatus::Responded)
    }

    pub fn can_cancel(&self) -> bool {
        matches!(self, QuoteStatus::Open | QuoteStatus::Responded)
    }

    pub const ALL: [QuoteStatus; 5] = [
        QuoteStatus::Open,
        QuoteStatus::Responded,
        QuoteStatus::Closed,
        QuoteStatus::Cancelled,
        QuoteStatus::Expired,
    ];
}

impl FromStr for QuoteStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" | "aberta" => Ok(QuoteStatus::Open),
            "responded" | "respondida" => Ok(QuoteStatus::Responded),
            "closed" | "fechada" => Ok(QuoteStatus::Closed),
            "cancelled" | "cancelada" => Ok(QuoteStatus::Cancelled),
            "expired" | "expirada" => Ok(QuoteStatus::Expired),
            _ => Err(format!("Invalid quote status: {}", s)),
        }
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteItem {
    pub id: Uuid,
    pub material_id: Option<Uuid>,
    pub description: String,
    pub quantity: f64,
    pub unit: String,
}

/// A client's request for pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    pub id: Uuid,
    /// Account that requested the quote.
    pub client_user_id: Uuid,
    pub grupo_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub delivery_city: Option<String>,
    pub delivery_uf: Option<String>,
    pub deadline: Option<NaiveDate>,
    pub status: QuoteStatus,
    pub items: Vec<QuoteItem>,
    pub proposal_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Quote {
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.client_user_id == user_id
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteItemRequest {
    pub material_id: Option<Uuid>,

    #[validate(length(min = 1, max = 300, message = "Item description must be between 1 and 300 characters"))]
    pub description: String,

    pub quantity: f64,

    #[validate(length(min = 1, max = 20, message = "Unit must be between 1 and 20 characters"))]
    pub unit: String,
}

pub const MAX_QUOTE_ITEMS: usize = 100;

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuoteRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,

    #[validate(length(max = 4000, message = "Description must be at most 4000 characters"))]
    pub description: Option<String>,

    pub grupo_id: Option<Uuid>,

    #[validate(length(max = 120, message = "City must be at most 120 characters"))]
    pub delivery_city: Option<String>,

    #[validate(custom(function = "shared::validation::validate_uf"))]
    pub delivery_uf: Option<String>,

    pub deadline: Option<NaiveDate>,

    #[validate(nested)]
    pub items: Vec<CreateQuoteItemRequest>,
}

impl CreateQuoteRequest {
    /// Rules beyond field shape: item count, positive quantities and a
    /// deadline that is not already in the past.
    pub fn check_rules(&self, today: NaiveDate) -> Result<(), String> {
        if self.items.is_empty() || self.items.len() > MAX_QUOTE_ITEMS {
            return Err(format!(
                "A quote needs between 1 and {} items",
                MAX_QUOTE_ITEMS
            ));
        }
        if let Some(item) = self
            .items
            .iter()
            .find(|i| !i.quantity.is_finite() || i.quantity <= 0.0)
        {
            return Err(format!(
                "Quantity for '{}' must be greater than zero",
                item.description
            ));
        }
        if let Some(deadline) = self.deadline {
            if deadline < today {
                return Err("Deadline cannot be in the past".to_string());
            }
        }
        Ok(())
    }
}

/// Query filters for quote listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteFilter {
    pub status: Option<QuoteStatus>,
}
