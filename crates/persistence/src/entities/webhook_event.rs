//! Webhook event entity.

use chrono::{DateTime, Utc};
use domain::models::webhook_event::{WebhookEvent, WebhookEventStatus, WebhookProvider};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct WebhookEventEntity {
    pub id: Uuid,
    pub provider: String,
    pub event_type: Option<String>,
    pub external_id: Option<String>,
    pub signature_valid: bool,
    pub payload: serde_json::Value,
    pub status: String,
    pub error: Option<String>,
    pub received_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl From<WebhookEventEntity> for WebhookEvent {
    fn from(e: WebhookEventEntity) -> Self {
        let status = match e.status.as_str() {
            "processed" => WebhookEventStatus::Processed,
            "failed" => WebhookEventStatus::Failed,
            "rejected" => WebhookEventStatus::Rejected,
            _ => WebhookEventStatus::Received,
        };
        Self {
            id: e.id,
            provider: e.provider.parse().unwrap_or(WebhookProvider::Generic),
            event_type: e.event_type,
            external_id: e.external_id,
            signature_valid: e.signature_valid,
            payload: e.payload,
            status,
            error: e.error,
            received_at: e.received_at,
            processed_at: e.processed_at,
        }
    }
}
