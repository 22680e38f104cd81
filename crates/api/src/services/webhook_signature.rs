//! Signature checks for inbound webhooks.

use shared::crypto::{hmac_sha256_hex, verify_hmac_sha256};

/// Parsed `x-signature: ts=<ts>,v1=<hash>` header sent by Mercado Pago.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MercadoPagoSignature {
    pub ts: String,
    pub v1: String,
}

impl MercadoPagoSignature {
    pub fn parse(header: &str) -> Option<Self> {
        let mut ts = None;
        let mut v1 = None;
        for part in header.split(',') {
            let Some((key, value)) = part.split_once('=') else {
                continue;
            };
            match key.trim() {
                "ts" => ts = Some(value.trim().to_string()),
                "v1" => v1 = Some(value.trim().to_string()),
                _ => {}
            }
        }
        Some(Self { ts: ts?, v1: v1? })
    }
}

/// Builds the signed manifest `id:<data.id>;request-id:<x-request-id>;ts:<ts>;`.
/// Missing parts are left out. Alphanumeric data ids are lowercased.
pub fn mercadopago_manifest(data_id: Option<&str>, request_id: Option<&str>, ts: &str) -> String {
    let mut manifest = String::new();
    if let Some(id) = data_id.filter(|id| !id.is_empty()) {
        manifest.push_str(&format!("id:{};", id.to_lowercase()));
    }
    if let Some(request_id) = request_id.filter(|r| !r.is_empty()) {
        manifest.push_str(&format!("request-id:{};", request_id));
    }
    manifest.push_str(&format!("ts:{};", ts));
    manifest
}

pub fn verify_mercadopago(
    secret: &str,
    signature_header: Option<&str>,
    request_id: Option<&str>,
    data_id: Option<&str>,
) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(signature) = signature_header.and_then(MercadoPagoSignature::parse) else {
        return false;
    };
    let manifest = mercadopago_manifest(data_id, request_id, &signature.ts);
    verify_hmac_sha256(secret, manifest.as_bytes(), &signature.v1)
}

/// `sha256=<hex>` over the raw body (generic senders and WhatsApp Cloud API).
pub fn verify_body_signature(secret: &str, body: &[u8], signature_header: Option<&str>) -> bool {
    match signature_header {
        Some(signature) if !secret.is_empty() => verify_hmac_sha256(secret, body, signature),
        _ => false,
    }
}

/// Header value a sender would produce for `body`.
pub fn sign_body(secret: &str, body: &[u8]) -> String {
    format!("sha256={}", hmac_sha256_hex(secret, body))
}

/// Compares shared tokens without short-circuiting on the first mismatch.
pub fn tokens_match(expected: &str, provided: &str) -> bool {
    if expected.is_empty() || expected.len() != provided.len() {
        return false;
    }
    expected
        .bytes()
        .zip(provided.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}
