//! Security headers middleware.
//!
//! Adds security-related HTTP headers to all responses.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

use crate::app::AppState;

/// Security header names.
pub mod headers {
    pub const X_CONTENT_TYPE_OPTIONS: &str = "x-content-type-options";
    pub const X_FRAME_OPTIONS: &str = "x-frame-options";
    pub const REFERRER_POLICY: &str = "referrer-policy";
}

const HSTS_VALUE: &str = "max-age=31536000; includeSubDomains";

/// Adds `nosniff`, `DENY` framing and a strict referrer policy to every
/// response. HSTS is only sent when `security.hsts_enabled` is set, which
/// should match TLS termination at the load balancer.
pub async fn security_headers_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(req).await;
    apply_security_headers(response.headers_mut(), state.config.security.hsts_enabled);
    response
}

fn apply_security_headers(headers: &mut HeaderMap, hsts_enabled: bool) {
    headers.insert(
        header::HeaderName::from_static(headers::X_CONTENT_TYPE_OPTIONS),
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(
        header::HeaderName::from_static(headers::X_FRAME_OPTIONS),
        HeaderValue::from_static("DENY"),
    );
    headers.insert(
        header::HeaderName::from_static(headers::REFERRER_POLICY),
        HeaderValue::from_static("strict-origin-when-cross-origin"),
    );

    if hsts_enabled {
        headers.insert(
            header::STRICT_TRANSPORT_SECURITY,
            HeaderValue::from_static(HSTS_VALUE),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_without_hsts() {
        let mut map = HeaderMap::new();
        apply_security_headers(&mut map, false);
        assert_eq!(map.get(headers::X_CONTENT_TYPE_OPTIONS).unwrap(), "nosniff");
        assert_eq!(map.get(headers::X_FRAME_OPTIONS).unwrap(), "DENY");
        assert!(map.get(header::STRICT_TRANSPORT_SECURITY).is_none());
    }

    #[test]
    fn test_headers_with_hsts() {
        let mut map = HeaderMap::new();
        apply_security_headers(&mut map, true);
        assert_eq!(
            map.get(header::STRICT_TRANSPORT_SECURITY).unwrap(),
            HSTS_VALUE
        );
    }

    #[test]
    fn test_existing_values_are_overwritten() {
        let mut map = HeaderMap::new();
        map.insert(
            header::HeaderName::from_static(headers::X_FRAME_OPTIONS),
            HeaderValue::from_static("SAMEORIGIN"),
        );
        apply_security_headers(&mut map, false);
        assert_eq!(map.get(headers::X_FRAME_OPTIONS).unwrap(), "DENY");
    }
}
