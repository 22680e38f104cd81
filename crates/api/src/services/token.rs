//! Access token resolution from request headers and cookies.
//!
//! Sources are tried in order and the first non-empty token wins:
//!
//! 1. `Authorization: Bearer <token>` (API callers only)
//! 2. the auth SDK session cookie `sb-<ref>-auth-token`, possibly split into
//!    `.0`, `.1`, … chunks. Its value is a JSON array whose first element is
//!    the access token (or a session object with `access_token`), optionally
//!    percent-encoded or `base64-` prefixed
//! 3. the plain `token` cookie set by our own login
//! 4. the legacy `sb-access-token` cookie

use axum::http::{header, HeaderMap};
use axum_extra::extract::cookie::CookieJar;
use base64::{engine::general_purpose, Engine as _};
use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;

/// Cookie set by `POST /api/auth/login`.
pub const TOKEN_COOKIE: &str = "token";

/// Cookie written by older versions of the web client.
pub const LEGACY_TOKEN_COOKIE: &str = "sb-access-token";

const SESSION_COOKIE_PREFIX: &str = "sb-";
const SESSION_COOKIE_SUFFIX: &str = "-auth-token";
const BASE64_PREFIX: &str = "base64-";

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    AuthorizationHeader,
    SessionCookie,
    TokenCookie,
    LegacyCookie,
}

impl TokenSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenSource::AuthorizationHeader => "authorization_header",
            TokenSource::SessionCookie => "session_cookie",
            TokenSource::TokenCookie => "token_cookie",
            TokenSource::LegacyCookie => "legacy_cookie",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub token: String,
    pub source: TokenSource,
}

/// Resolves the access token for a request.
///
/// Page navigations never carry an `Authorization` header, so the route guard
/// calls this with `include_header = false`.
pub fn resolve_token(headers: &HeaderMap, include_header: bool) -> Option<ResolvedToken> {
    if include_header {
        if let Some(token) = bearer_token(headers) {
            return Some(ResolvedToken {
                token,
                source: TokenSource::AuthorizationHeader,
            });
        }
    }

    let jar = CookieJar::from_headers(headers);

    if let Some(token) = session_cookie_token(&jar) {
        return Some(ResolvedToken {
            token,
            source: TokenSource::SessionCookie,
        });
    }

    for (name, source) in [
        (TOKEN_COOKIE, TokenSource::TokenCookie),
        (LEGACY_TOKEN_COOKIE, TokenSource::LegacyCookie),
    ] {
        if let Some(token) = jar
            .get(name)
            .map(|c| c.value().trim())
            .filter(|v| !v.is_empty())
        {
            return Some(ResolvedToken {
                token: token.to_string(),
                source,
            });
        }
    }

    None
}

/// Names of every auth cookie present on the request, chunks included.
pub fn auth_cookie_names(headers: &HeaderMap) -> Vec<String> {
    let mut names: Vec<String> = CookieJar::from_headers(headers)
        .iter()
        .map(|c| c.name().to_string())
        .filter(|name| {
            name == TOKEN_COOKIE
                || name == LEGACY_TOKEN_COOKIE
                || parse_session_name(name).is_some()
        })
        .collect();
    names.sort();
    names
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

/// Splits `sb-<ref>-auth-token[.N]` into its base name and chunk index.
/// Unchunked cookies report `None` as index.
fn parse_session_name(name: &str) -> Option<(&str, Option<u32>)> {
    if is_session_base(name) {
        return Some((name, None));
    }
    let (base, index) = name.rsplit_once('.')?;
    if !is_session_base(base) {
        return None;
    }
    let index = index.parse().ok()?;
    Some((base, Some(index)))
}

fn is_session_base(name: &str) -> bool {
    name.starts_with(SESSION_COOKIE_PREFIX)
        && name.ends_with(SESSION_COOKIE_SUFFIX)
        && name.len() > SESSION_COOKIE_PREFIX.len() + SESSION_COOKIE_SUFFIX.len()
}

fn session_cookie_token(jar: &CookieJar) -> Option<String> {
    // base name -> (whole value, chunks by index)
    let mut sessions: BTreeMap<String, (Option<String>, BTreeMap<u32, String>)> = BTreeMap::new();

    for cookie in jar.iter() {
        let Some((base, index)) = parse_session_name(cookie.name()) else {
            continue;
        };
        let entry = sessions.entry(base.to_string()).or_default();
        match index {
            None => entry.0 = Some(cookie.value().to_string()),
            Some(i) => {
                entry.1.insert(i, cookie.value().to_string());
            }
        }
    }

    sessions.into_values().find_map(|(whole, chunks)| {
        let raw = match whole {
            Some(value) if !value.is_empty() => value,
            _ => contiguous_chunks(&chunks)?,
        };
        access_token_from_session_value(&raw)
    })
}

/// Joins chunks `.0`, `.1`, … stopping at the first gap.
fn contiguous_chunks(chunks: &BTreeMap<u32, String>) -> Option<String> {
    let mut joined = String::new();
    let mut expected = 0u32;
    for (index, value) in chunks {
        if *index != expected {
            break;
        }
        joined.push_str(value);
        expected += 1;
    }
    (!joined.is_empty()).then_some(joined)
}

/// Decodes a session cookie value and extracts the access token.
pub fn access_token_from_session_value(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let decoded = if let Some(encoded) = raw.strip_prefix(BASE64_PREFIX) {
        decode_base64(encoded)?
    } else if raw.contains('%') {
        percent_decode_str(raw).decode_utf8().ok()?.into_owned()
    } else {
        raw.to_string()
    };

    let value: serde_json::Value = serde_json::from_str(&decoded).ok()?;
    let token = match &value {
        serde_json::Value::Array(items) => items.first()?.as_str()?,
        serde_json::Value::Object(map) => map.get("access_token")?.as_str()?,
        serde_json::Value::String(s) => s.as_str(),
        _ => return None,
    };
    let token = token.trim();
    (!token.is_empty()).then(|| token.to_string())
}

fn decode_base64(encoded: &str) -> Option<String> {
    let trimmed = encoded.trim_end_matches('=');
    let bytes = general_purpose::URL_SAFE_NO_PAD
        .decode(trimmed)
        .or_else(|_| general_purpose::STANDARD_NO_PAD.decode(trimmed))
        .ok()?;
    String::from_utf8(bytes).ok()
}
