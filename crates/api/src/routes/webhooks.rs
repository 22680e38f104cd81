//! Inbound webhooks: Mercado Pago, SendGrid, generic HMAC senders, WhatsApp.
//!
//! Every event endpoint answers 200 so providers stop retrying; failures are
//! stored on the event row and logged. `received` is true only when the
//! event was verified and stored.

use std::collections::HashMap;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use domain::models::webhook_event::NewWebhookEvent;
use domain::models::{PaymentStatus, WebhookProvider};
use persistence::repositories::{OrderRepository, WebhookEventRepository};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::middleware::metrics::record_webhook_received;
use crate::services::webhook_signature::{
    tokens_match, verify_body_signature, verify_mercadopago,
};

pub const MERCADOPAGO_SIGNATURE_HEADER: &str = "x-signature";
pub const GENERIC_SIGNATURE_HEADER: &str = "x-webhook-signature";
pub const WHATSAPP_SIGNATURE_HEADER: &str = "x-hub-signature-256";

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

fn ack(received: bool) -> Json<WebhookAck> {
    Json(WebhookAck { received })
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Raw JSON body, or the body as a string when it does not parse.
fn parse_payload(body: &[u8]) -> Value {
    serde_json::from_slice(body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(body).into_owned()))
}

fn str_at<'a>(payload: &'a Value, pointer: &str) -> Option<&'a str> {
    payload.pointer(pointer).and_then(Value::as_str)
}

/// Scalar at `pointer` as a string; Mercado Pago sends ids as numbers or strings.
fn id_at(payload: &Value, pointer: &str) -> Option<String> {
    match payload.pointer(pointer)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Stores the event. Unverified events are stored but not processed.
/// Returns the event id when processing should continue.
async fn ingest(state: &AppState, event: NewWebhookEvent) -> Option<Uuid> {
    let provider = event.provider.as_str();
    let verified = event.signature_valid;

    let stored = WebhookEventRepository::new(state.pool.clone())
        .insert(&event)
        .await;

    let id = match stored {
        Ok(id) => id,
        Err(e) => {
            warn!(provider = provider, error = %e, "Failed to store webhook event");
            record_webhook_received(provider, "failed");
            return None;
        }
    };

    if !verified {
        warn!(provider = provider, event_id = %id, "Webhook signature invalid; event ignored");
        record_webhook_received(provider, "invalid_signature");
        return None;
    }
    Some(id)
}

/// Records the processing result on the stored event.
async fn finish(state: &AppState, provider: WebhookProvider, id: Uuid, result: Result<(), String>) {
    let repo = WebhookEventRepository::new(state.pool.clone());
    let provider = provider.as_str();
    let stored = match &result {
        Ok(()) => {
            record_webhook_received(provider, "processed");
            repo.mark_processed(id).await
        }
        Err(reason) => {
            warn!(provider = provider, event_id = %id, reason = %reason, "Webhook processing failed");
            record_webhook_received(provider, "failed");
            repo.mark_failed(id, reason).await
        }
    };
    if let Err(e) = stored {
        warn!(provider = provider, event_id = %id, error = %e, "Failed to update webhook event");
    }
}

/// Payment update carried by a Mercado Pago notification, if any.
#[derive(Debug, PartialEq)]
struct PaymentUpdate {
    order_id: Uuid,
    status: PaymentStatus,
    reference: String,
}

fn payment_update(payload: &Value, data_id: Option<&str>) -> Result<Option<PaymentUpdate>, String> {
    let event_type = str_at(payload, "/type").or_else(|| str_at(payload, "/topic"));
    if event_type != Some("payment") {
        return Ok(None);
    }

    let Some(external_reference) = str_at(payload, "/external_reference")
        .or_else(|| str_at(payload, "/data/external_reference"))
    else {
        return Ok(None);
    };
    let order_id = Uuid::parse_str(external_reference.trim())
        .map_err(|_| format!("external_reference is not an order id: {}", external_reference))?;

    let raw_status = str_at(payload, "/data/status")
        .or_else(|| str_at(payload, "/status"))
        .ok_or_else(|| "payment status missing".to_string())?;
    let status = PaymentStatus::from_mercadopago(raw_status)
        .ok_or_else(|| format!("unknown payment status: {}", raw_status))?;

    let reference = data_id
        .map(str::to_string)
        .unwrap_or_else(|| external_reference.to_string());
    Ok(Some(PaymentUpdate {
        order_id,
        status,
        reference,
    }))
}

/// POST /api/webhooks/mercadopago
pub async fn mercadopago(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let payload = parse_payload(&body);
    let data_id = query
        .get("data.id")
        .cloned()
        .or_else(|| id_at(&payload, "/data/id"));

    let signature_valid = verify_mercadopago(
        &state.config.webhooks.mercadopago_secret,
        header(&headers, MERCADOPAGO_SIGNATURE_HEADER),
        header(&headers, crate::middleware::REQUEST_ID_HEADER),
        data_id.as_deref(),
    );

    let event = NewWebhookEvent {
        provider: WebhookProvider::MercadoPago,
        event_type: str_at(&payload, "/type")
            .or_else(|| str_at(&payload, "/action"))
            .map(str::to_string),
        external_id: data_id.clone(),
        signature_valid,
        payload,
    };
    let payload = event.payload.clone();
    let Some(id) = ingest(&state, event).await else {
        return ack(false);
    };

    let result = match payment_update(&payload, data_id.as_deref()) {
        Ok(Some(update)) => match OrderRepository::new(state.pool.clone())
            .update_payment(update.order_id, update.status, &update.reference)
            .await
        {
            Ok(true) => {
                info!(order_id = %update.order_id, status = %update.status, "Order payment updated");
                Ok(())
            }
            Ok(false) => Err(format!("order {} not found", update.order_id)),
            Err(e) => Err(e.to_string()),
        },
        Ok(None) => Ok(()),
        Err(reason) => Err(reason),
    };
    finish(&state, WebhookProvider::MercadoPago, id, result).await;
    ack(true)
}

/// POST /api/webhooks/sendgrid?token=
///
/// SendGrid posts a JSON array of delivery events.
pub async fn sendgrid(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
    body: Bytes,
) -> Json<WebhookAck> {
    let expected = &state.config.webhooks.sendgrid_token;
    let signature_valid = query
        .get("token")
        .is_some_and(|provided| tokens_match(expected, provided));

    let payload = parse_payload(&body);
    let events = payload.as_array().map(Vec::len).unwrap_or(0);
    let event = NewWebhookEvent {
        provider: WebhookProvider::SendGrid,
        event_type: Some("batch".to_string()),
        external_id: str_at(&payload, "/0/sg_event_id").map(str::to_string),
        signature_valid,
        payload,
    };
    let payload = event.payload.clone();
    let Some(id) = ingest(&state, event).await else {
        return ack(false);
    };

    let result = match payload.as_array() {
        Some(items) => {
            for item in items {
                let kind = str_at(item, "/event").unwrap_or("unknown");
                if matches!(kind, "bounce" | "dropped" | "spamreport") {
                    warn!(
                        email = str_at(item, "/email").unwrap_or_default(),
                        event = kind,
                        "Email delivery problem reported"
                    );
                }
            }
            info!(events = events, "SendGrid events received");
            Ok(())
        }
        None => Err("expected a JSON array of events".to_string()),
    };
    finish(&state, WebhookProvider::SendGrid, id, result).await;
    ack(true)
}

/// POST /api/webhooks/generic
pub async fn generic(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let signature_valid = verify_body_signature(
        &state.config.webhooks.generic_secret,
        &body,
        header(&headers, GENERIC_SIGNATURE_HEADER),
    );

    let payload = parse_payload(&body);
    let event = NewWebhookEvent {
        provider: WebhookProvider::Generic,
        event_type: str_at(&payload, "/event")
            .or_else(|| str_at(&payload, "/type"))
            .map(str::to_string),
        external_id: id_at(&payload, "/id"),
        signature_valid,
        payload,
    };
    let event_type = event.event_type.clone();
    let Some(id) = ingest(&state, event).await else {
        return ack(false);
    };

    info!(event_id = %id, event_type = ?event_type, "Generic webhook received");
    finish(&state, WebhookProvider::Generic, id, Ok(())).await;
    ack(true)
}

/// GET /api/webhooks/whatsapp?hub.mode=subscribe&hub.verify_token=&hub.challenge=
pub async fn whatsapp_verify(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mode = query.get("hub.mode").map(String::as_str);
    let token = query.get("hub.verify_token").map(String::as_str).unwrap_or_default();
    let expected = &state.config.webhooks.whatsapp_verify_token;

    match query.get("hub.challenge") {
        Some(challenge) if mode == Some("subscribe") && tokens_match(expected, token) => {
            info!("WhatsApp webhook verified");
            (StatusCode::OK, challenge.clone()).into_response()
        }
        _ => {
            warn!("WhatsApp webhook verification rejected");
            StatusCode::FORBIDDEN.into_response()
        }
    }
}

/// POST /api/webhooks/whatsapp
pub async fn whatsapp_event(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Json<WebhookAck> {
    let signature_valid = verify_body_signature(
        &state.config.webhooks.whatsapp_app_secret,
        &body,
        header(&headers, WHATSAPP_SIGNATURE_HEADER),
    );

    let payload = parse_payload(&body);
    let event = NewWebhookEvent {
        provider: WebhookProvider::WhatsApp,
        event_type: str_at(&payload, "/entry/0/changes/0/field")
            .or_else(|| str_at(&payload, "/object"))
            .map(str::to_string),
        external_id: str_at(&payload, "/entry/0/changes/0/value/messages/0/id")
            .map(str::to_string),
        signature_valid,
        payload,
    };
    let payload = event.payload.clone();
    let Some(id) = ingest(&state, event).await else {
        return ack(false);
    };

    let result = if str_at(&payload, "/object") == Some("whatsapp_business_account") {
        let messages: usize = payload
            .pointer("/entry")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|e| e.pointer("/changes").and_then(Value::as_array))
                    .flatten()
                    .filter_map(|c| c.pointer("/value/messages").and_then(Value::as_array))
                    .map(Vec::len)
                    .sum()
            })
            .unwrap_or(0);
        info!(event_id = %id, messages = messages, "WhatsApp event received");
        Ok(())
    } else {
        Err("unexpected object type".to_string())
    };
    finish(&state, WebhookProvider::WhatsApp, id, result).await;
    ack(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_payload_keeps_invalid_json() {
        assert_eq!(parse_payload(br#"{"a":1}"#), json!({"a": 1}));
        assert_eq!(parse_payload(b"not json"), json!("not json"));
    }

    #[test]
    fn test_id_at_accepts_numbers() {
        let payload = json!({"data": {"id": 123456}});
        assert_eq!(id_at(&payload, "/data/id").as_deref(), Some("123456"));
        assert_eq!(id_at(&json!({"data": {"id": ""}}), "/data/id"), None);
    }

    #[test]
    fn test_payment_update() {
        let order_id = Uuid::new_v4();
        let payload = json!({
            "type": "payment",
            "external_reference": order_id.to_string(),
            "data": {"id": "987", "status": "approved"}
        });
        let update = payment_update(&payload, Some("987")).unwrap().unwrap();
        assert_eq!(update.order_id, order_id);
        assert_eq!(update.status, PaymentStatus::Approved);
        assert_eq!(update.reference, "987");
    }

    #[test]
    fn test_payment_update_ignores_other_topics() {
        let payload = json!({"type": "merchant_order", "data": {"id": "1"}});
        assert_eq!(payment_update(&payload, Some("1")).unwrap(), None);

        let no_reference = json!({"type": "payment", "data": {"id": "1", "status": "approved"}});
        assert_eq!(payment_update(&no_reference, Some("1")).unwrap(), None);
    }

    #[test]
    fn test_payment_update_rejects_bad_reference() {
        let payload = json!({
            "type": "payment",
            "external_reference": "pedido-42",
            "data": {"status": "approved"}
        });
        assert!(payment_update(&payload, None).is_err());
    }
}
