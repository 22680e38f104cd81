//! Integration tests for the page route guard.
//!
//! The guard validates session cookies locally, so no database is needed.
//! Most tests point at a missing frontend directory, which makes allowed pages
//! answer 503; the exported-file tests write a small static export instead.

mod common;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use base64::{engine::general_purpose, Engine as _};
use common::{create_test_app, lazy_pool, response_text, test_config, token_for};
use domain::models::Role;
use std::path::PathBuf;
use tower::ServiceExt;
use uuid::Uuid;

fn guarded_app() -> Router {
    let mut config = test_config();
    config.frontend.enabled = true;
    config.frontend.base_dir = format!("/nonexistent/frontend-{}", Uuid::new_v4().simple());
    create_test_app(config, lazy_pool())
}

/// Static export with the admin dashboard in both page layouts.
struct ExportedFrontend {
    dir: PathBuf,
}

impl ExportedFrontend {
    fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("cc-frontend-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(dir.join("dashboard/admin")).unwrap();
        std::fs::create_dir_all(dir.join("_next/static")).unwrap();
        std::fs::write(dir.join("index.html"), "HOME").unwrap();
        std::fs::write(dir.join("dashboard/admin.html"), "ADMIN PAGE").unwrap();
        std::fs::write(dir.join("dashboard/admin/index.html"), "ADMIN INDEX").unwrap();
        std::fs::write(dir.join("dashboard/admin.txt"), "ADMIN PAYLOAD").unwrap();
        std::fs::write(dir.join("_next/static/app.js"), "console.log(1)").unwrap();
        Self { dir }
    }

    fn app(&self) -> Router {
        let mut config = test_config();
        config.frontend.enabled = true;
        config.frontend.base_dir = self.dir.to_string_lossy().into_owned();
        create_test_app(config, lazy_pool())
    }
}

impl Drop for ExportedFrontend {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

fn page(path: &str, cookie: Option<String>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn session_cookie(role: Role, must_change_password: bool) -> String {
    let token = token_for(Uuid::new_v4(), "pagina@example.com", role, must_change_password);
    format!("token={}", token)
}

fn location(response: &Response) -> &str {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_dashboard_without_session_redirects_to_login() {
    let response = guarded_app()
        .oneshot(page("/dashboard/admin", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?redirect=%2Fdashboard%2Fadmin");
}

#[tokio::test]
async fn test_authorization_header_is_ignored_for_pages() {
    let token = token_for(Uuid::new_v4(), "admin@example.com", Role::Admin, false);
    let request = Request::builder()
        .uri("/dashboard/admin")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = guarded_app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert!(location(&response).starts_with("/login?redirect="));
}

#[tokio::test]
async fn test_wrong_role_goes_to_own_dashboard() {
    let response = guarded_app()
        .oneshot(page("/dashboard/admin/usuarios", Some(session_cookie(Role::Client, false))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard/cliente");
}

#[tokio::test]
async fn test_matching_role_reaches_frontend() {
    let response = guarded_app()
        .oneshot(page("/dashboard/fornecedor", Some(session_cookie(Role::Supplier, false))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_forced_password_change() {
    let response = guarded_app()
        .oneshot(page("/dashboard/cliente", Some(session_cookie(Role::Client, true))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/alterar-senha");
}

#[tokio::test]
async fn test_login_page_with_session_redirects() {
    let response = guarded_app()
        .oneshot(page("/login", Some(session_cookie(Role::Admin, false))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/dashboard/admin");
}

#[tokio::test]
async fn test_public_pages_pass_through() {
    for path in ["/", "/login", "/sobre"] {
        let response = guarded_app().oneshot(page(path, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE, "{}", path);
    }
}

#[tokio::test]
async fn test_invalid_cookie_counts_as_no_session() {
    let response = guarded_app()
        .oneshot(page("/dashboard/cliente", Some("token=forged.token.value".to_string())))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&response), "/login?redirect=%2Fdashboard%2Fcliente");
}

#[tokio::test]
async fn test_chunked_sdk_session_cookie() {
    let token = token_for(Uuid::new_v4(), "sdk@example.com", Role::Admin, false);
    let value = format!(
        "base64-{}",
        general_purpose::URL_SAFE_NO_PAD.encode(format!(r#"["{}","refresh"]"#, token))
    );
    let (first, second) = value.split_at(value.len() / 2);
    let cookie = format!("sb-proj-auth-token.0={}; sb-proj-auth-token.1={}", first, second);

    let response = guarded_app()
        .oneshot(page("/dashboard/admin", Some(cookie)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_api_paths_are_not_redirected() {
    let response = guarded_app()
        .oneshot(page("/api/auth/me", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_exported_page_files_require_session() {
    let frontend = ExportedFrontend::new();

    for path in [
        "/dashboard/admin.html",
        "/dashboard/admin/index.html",
        "/dashboard/admin.txt",
        "//dashboard/admin",
        "/dashboard//admin.html",
        "/dashboard/./admin",
        "/sobre/../dashboard/admin",
    ] {
        let response = frontend.app().oneshot(page(path, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{}", path);
        assert_eq!(
            location(&response),
            "/login?redirect=%2Fdashboard%2Fadmin",
            "{}",
            path
        );
    }
}

#[tokio::test]
async fn test_exported_page_files_check_role() {
    let frontend = ExportedFrontend::new();

    for path in ["/dashboard/admin.html", "/dashboard/admin/index.html", "//dashboard/admin"] {
        let response = frontend
            .app()
            .oneshot(page(path, Some(session_cookie(Role::Client, false))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT, "{}", path);
        assert_eq!(location(&response), "/dashboard/cliente", "{}", path);
    }
}

#[tokio::test]
async fn test_admin_receives_exported_page() {
    let frontend = ExportedFrontend::new();

    let response = frontend
        .app()
        .oneshot(page("/dashboard/admin.html", Some(session_cookie(Role::Admin, false))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "ADMIN PAGE");

    let response = frontend
        .app()
        .oneshot(page("/dashboard/admin", Some(session_cookie(Role::Admin, false))))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "ADMIN PAGE");
}

#[tokio::test]
async fn test_build_assets_served_without_session() {
    let frontend = ExportedFrontend::new();

    let response = frontend
        .app()
        .oneshot(page("/_next/static/app.js", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = frontend.app().oneshot(page("/index.html", None)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_text(response).await, "HOME");
}
