//! Page route guard.
//!
//! Runs in front of the static frontend. Browsers navigating pages never send
//! an `Authorization` header, so the session is read from auth cookies only
//! and validated locally (no database round trip). Access rules live in
//! [`domain::services::route_access`].

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use domain::models::Role;
use domain::services::route_access::{self, RouteDecision, SessionInfo, LOGIN_PATH};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use shared::jwt::JwtConfig;

use crate::app::AppState;
use crate::services::token::resolve_token;

const SKIPPED_PREFIXES: &[&str] = &["/api", "/_next", "/metrics"];

/// Extensions served without a session check. Page exports (`.html`, `.txt`)
/// never appear here.
const STATIC_EXTENSIONS: &[&str] = &[
    "css", "js", "map", "png", "jpg", "jpeg", "gif", "svg", "webp", "avif", "ico", "woff",
    "woff2", "ttf", "otf", "webmanifest",
];

/// Exported page files that render the route they are named after.
const PAGE_EXTENSIONS: &[&str] = &["html", "htm", "txt"];

fn extension(segment: &str) -> Option<String> {
    segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// The route a request path renders once the frontend has resolved it.
///
/// Empty and `.` segments are dropped, `..` pops, a trailing `index` page is
/// removed and page extensions are stripped, so `//dashboard/admin`,
/// `/dashboard/admin.html` and `/dashboard/admin/index.html` all map to
/// `/dashboard/admin`.
pub fn page_route(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if let Some(segment) = segments.pop() {
        let stem = match extension(segment) {
            Some(ext) if PAGE_EXTENSIONS.contains(&ext.as_str()) => {
                &segment[..segment.len() - ext.len() - 1]
            }
            _ => segment,
        };
        if !stem.is_empty() && !stem.eq_ignore_ascii_case("index") {
            segments.push(stem);
        }
    }

    format!("/{}", segments.join("/"))
}

/// API routes, build assets and static files pass through; every other path,
/// page exports included, goes through the guard.
pub fn is_guarded_route(route: &str) -> bool {
    if SKIPPED_PREFIXES
        .iter()
        .any(|prefix| route == *prefix || route.starts_with(&format!("{}/", prefix)))
    {
        return false;
    }
    let last_segment = route.rsplit('/').next().unwrap_or_default();
    !matches!(extension(last_segment), Some(ext) if STATIC_EXTENSIONS.contains(&ext.as_str()))
}

fn session_from_headers(jwt: &JwtConfig, headers: &axum::http::HeaderMap) -> Option<SessionInfo> {
    let resolved = resolve_token(headers, false)?;
    match jwt.validate_access_token(&resolved.token) {
        Ok(claims) => Some(SessionInfo {
            role: Role::resolve(&claims.roles),
            must_change_password: claims.must_change_password,
        }),
        Err(e) => {
            tracing::debug!(error = %e, "Ignoring invalid session cookie");
            None
        }
    }
}

/// `/login?redirect=<percent-encoded path>`
pub fn login_redirect_location(redirect: &str) -> String {
    format!(
        "{}?redirect={}",
        LOGIN_PATH,
        utf8_percent_encode(redirect, NON_ALPHANUMERIC)
    )
}

fn temporary_redirect(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, value)]).into_response(),
        Err(_) => (
            StatusCode::TEMPORARY_REDIRECT,
            [(header::LOCATION, HeaderValue::from_static(LOGIN_PATH))],
        )
            .into_response(),
    }
}

pub async fn route_guard(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    let route = page_route(req.uri().path());
    if !is_guarded_route(&route) {
        return next.run(req).await;
    }

    let session = session_from_headers(&state.jwt, req.headers());
    match route_access::decide(&route, session.as_ref()) {
        RouteDecision::Allow => next.run(req).await,
        RouteDecision::Login { redirect } => {
            tracing::debug!(route = %route, "Page requires a session");
            temporary_redirect(&login_redirect_location(&redirect))
        }
        RouteDecision::Redirect(location) => temporary_redirect(&location),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_routes() {
        assert!(is_guarded_route("/"));
        assert!(is_guarded_route("/dashboard/admin"));
        assert!(is_guarded_route("/login"));
        assert!(is_guarded_route("/apiary"));
        assert!(is_guarded_route("/dashboard/admin/relatorio.pdf"));
    }

    #[test]
    fn test_skipped_routes() {
        assert!(!is_guarded_route("/api/auth/me"));
        assert!(!is_guarded_route("/api"));
        assert!(!is_guarded_route("/_next/static/chunk.js"));
        assert!(!is_guarded_route("/metrics"));
        assert!(!is_guarded_route("/favicon.ico"));
        assert!(!is_guarded_route("/dashboard/logo.PNG"));
    }

    #[test]
    fn test_page_route_resolves_exported_files() {
        assert_eq!(page_route("/"), "/");
        assert_eq!(page_route(""), "/");
        assert_eq!(page_route("/index.html"), "/");
        assert_eq!(page_route("/dashboard/admin.html"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard/admin.HTM"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard/admin.txt"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard/admin/index.html"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard/admin/index"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard/admin/"), "/dashboard/admin");
    }

    #[test]
    fn test_page_route_collapses_segments() {
        assert_eq!(page_route("//dashboard/admin"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard//admin"), "/dashboard/admin");
        assert_eq!(page_route("/dashboard/./admin/."), "/dashboard/admin");
        assert_eq!(page_route("/sobre/../dashboard/admin"), "/dashboard/admin");
        assert_eq!(page_route("/../../dashboard/admin"), "/dashboard/admin");
        assert_eq!(page_route("//api/auth/me"), "/api/auth/me");
    }

    #[test]
    fn test_asset_paths_keep_extension() {
        assert_eq!(page_route("/_next/static/app.js"), "/_next/static/app.js");
        assert_eq!(page_route("/favicon.ico"), "/favicon.ico");
    }

    #[test]
    fn test_login_redirect_location_is_encoded() {
        assert_eq!(
            login_redirect_location("/dashboard/cliente"),
            "/login?redirect=%2Fdashboard%2Fcliente"
        );
    }
}
