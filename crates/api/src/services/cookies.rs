//! Session cookie helpers.
//!
//! Login sets a single httpOnly `token` cookie; logout expires every auth
//! cookie the browser sent, including auth SDK session chunks.

use axum::http::{header::SET_COOKIE, HeaderMap, HeaderValue};

use crate::config::AuthConfig;
use crate::services::token::{self, LEGACY_TOKEN_COOKIE, TOKEN_COOKIE};

#[derive(Debug, Clone)]
pub struct SessionCookies {
    secure: bool,
    max_age_secs: i64,
    project_ref: String,
}

impl SessionCookies {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            secure: config.cookie_secure,
            max_age_secs: config.access_token_expiry_secs,
            project_ref: config.project_ref.clone(),
        }
    }

    /// Set-Cookie value carrying a freshly issued access token.
    pub fn build_token_cookie(&self, access_token: &str) -> String {
        let mut cookie = format!(
            "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            TOKEN_COOKIE, access_token, self.max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    fn build_clear_cookie(&self, name: &str) -> String {
        let mut cookie = format!(
            "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax",
            name
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }

    pub fn add_token_cookie(&self, headers: &mut HeaderMap, access_token: &str) {
        if let Ok(value) = HeaderValue::from_str(&self.build_token_cookie(access_token)) {
            headers.append(SET_COOKIE, value);
        }
    }

    /// Expires `token`, the legacy cookie, the configured project's session
    /// cookie and any other auth cookie present on `request_headers`.
    pub fn add_clear_cookies(&self, request_headers: &HeaderMap, headers: &mut HeaderMap) {
        let mut names = vec![TOKEN_COOKIE.to_string(), LEGACY_TOKEN_COOKIE.to_string()];
        if !self.project_ref.is_empty() {
            names.push(format!("sb-{}-auth-token", self.project_ref));
        }
        for name in token::auth_cookie_names(request_headers) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        for name in names {
            if let Ok(value) = HeaderValue::from_str(&self.build_clear_cookie(&name)) {
                headers.append(SET_COOKIE, value);
            }
        }
    }
}
