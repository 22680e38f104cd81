//! Static export of the web frontend.
//!
//! Pages are exported as `page.html` or `page/index.html`; the route guard
//! has already decided whether the visitor may see the page by the time a
//! request gets here.

use axum::{
    body::Body,
    extract::State,
    http::{header, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::warn;

use crate::app::AppState;
use crate::config::FrontendConfig;

pub async fn serve_frontend(State(state): State<AppState>, uri: Uri) -> Response {
    let config = &state.config.frontend;
    let base_dir = PathBuf::from(&config.base_dir);

    if !base_dir.is_dir() {
        warn!(dir = %base_dir.display(), "Frontend directory does not exist");
        return (StatusCode::SERVICE_UNAVAILABLE, "Frontend not available").into_response();
    }

    let requested = uri.path().trim_start_matches('/');
    for candidate in candidate_files(&base_dir, requested) {
        if !is_safe_path(&base_dir, &candidate) {
            warn!(requested = %uri.path(), "Path traversal attempt detected");
            return StatusCode::FORBIDDEN.into_response();
        }
        if let Ok(response) = serve_file(&candidate, config, StatusCode::OK).await {
            return response;
        }
    }

    match serve_file(&base_dir.join("404.html"), config, StatusCode::NOT_FOUND).await {
        Ok(response) => response,
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Files tried, in order, for a request path.
fn candidate_files(base_dir: &Path, requested: &str) -> Vec<PathBuf> {
    let requested = requested.trim_end_matches('/');
    if requested.is_empty() {
        return vec![base_dir.join("index.html")];
    }

    let exact = base_dir.join(requested);
    if Path::new(requested).extension().is_some() {
        return vec![exact];
    }
    vec![
        base_dir.join(format!("{}.html", requested)),
        exact.join("index.html"),
    ]
}

async fn serve_file(
    path: &Path,
    config: &FrontendConfig,
    status: StatusCode,
) -> Result<Response, std::io::Error> {
    let content = fs::read(path).await?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();

    let cache_control = if is_immutable_asset(path) {
        format!(
            "public, max-age={}, immutable",
            config.immutable_cache_max_age
        )
    } else {
        format!("public, max-age={}", config.mutable_cache_max_age)
    };

    Ok((
        status,
        [
            (header::CONTENT_TYPE, mime.as_ref().to_string()),
            (header::CACHE_CONTROL, cache_control),
        ],
        Body::from(content),
    )
        .into_response())
}

/// True when `path` stays inside `base` once `.`/`..` are resolved.
fn is_safe_path(base: &Path, path: &Path) -> bool {
    if path.exists() {
        match (base.canonicalize(), path.canonicalize()) {
            (Ok(base), Ok(path)) => path.starts_with(base),
            _ => false,
        }
    } else {
        normalize_path(path).starts_with(normalize_path(base))
    }
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                result.pop();
            }
            Component::CurDir => {}
            other => result.push(other),
        }
    }
    result
}

/// Content-hashed build output.
fn is_immutable_asset(path: &Path) -> bool {
    let path = path.to_string_lossy();
    path.contains("_next/static/") || path.contains("_next\\static\\")
}
