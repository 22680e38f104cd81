//! Inbound webhook events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookProvider {
    MercadoPago,
    SendGrid,
    Generic,
    WhatsApp,
}

impl WebhookProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookProvider::MercadoPago => "mercadopago",
            WebhookProvider::SendGrid => "sendgrid",
            WebhookProvider::Generic => "generic",
            WebhookProvider::WhatsApp => "whatsapp",
        }
    }
}

impl FromStr for WebhookProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mercadopago" | "mercado_pago" => Ok(WebhookProvider::MercadoPago),
            "sendgrid" => Ok(WebhookProvider::SendGrid),
            "generic" => Ok(WebhookProvider::Generic),
            "whatsapp" => Ok(WebhookProvider::WhatsApp),
            _ => Err(format!("Unknown webhook provider: {}", s)),
        }
    }
}

impl fmt::Display for WebhookProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Processing state of a stored event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookEventStatus {
    Received,
    Processed,
    Failed,
    /// Signature did not verify; kept for inspection only.
    Rejected,
}

impl WebhookEventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            WebhookEventStatus::Received => "received",
            WebhookEventStatus::Processed => "processed",
            WebhookEventStatus::Failed => "failed",
            WebhookEventStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    pub id: Uuid,
    pub provider: WebhookProvider,
    pub event_type: Option<String>,
    pub external_id: Option<String>,
    pub signature_valid: bool,
    pub payload: JsonValue,
    pub status: WebhookEventStatus,
    pub error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

/// New event to store.
#[derive(Debug, Clone)]
pub struct NewWebhookEvent {
    pub provider: WebhookProvider,
    pub event_type: Option<String>,
    pub external_id: Option<String>,
    pub signature_valid: bool,
    pub payload: JsonValue,
}

impl NewWebhookEvent {
    pub fn initial_status(&self) -> WebhookEventStatus {
        if self.signature_valid {
            WebhookEventStatus::Received
        } else {
            WebhookEventStatus::Rejected
        }
    }
}
