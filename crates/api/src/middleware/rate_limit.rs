//! Rate limiting.
//!
//! Two layers:
//! - a general per-account throttle on authenticated routes (token bucket,
//!   `security.rate_limit_per_minute`)
//! - fixed-window policies for sensitive endpoints (login, lookups, admin
//!   password resets), applied by handlers through [`enforce`]

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::{
    clock::{Clock, DefaultClock},
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovRateLimiter,
};
use std::{
    collections::HashMap,
    num::NonZeroU32,
    sync::{Arc, RwLock},
};
use uuid::Uuid;

use crate::app::AppState;
use crate::config::RateLimitPolicy;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::services::RateDecision;

type AccountRateLimiter = GovRateLimiter<NotKeyed, InMemoryState, DefaultClock>;

const DEFAULT_PER_MINUTE: NonZeroU32 = match NonZeroU32::new(100) {
    Some(n) => n,
    None => unreachable!(),
};

/// Per-account throttle state, keyed by user id.
pub struct RateLimiterState {
    limiters: RwLock<HashMap<Uuid, Arc<AccountRateLimiter>>>,
    rate_limit_per_minute: u32,
}

impl RateLimiterState {
    pub fn new(rate_limit_per_minute: u32) -> Self {
        Self {
            limiters: RwLock::new(HashMap::new()),
            rate_limit_per_minute,
        }
    }

    fn get_or_create_limiter(&self, user_id: Uuid) -> Arc<AccountRateLimiter> {
        {
            let limiters = self.limiters.read().unwrap_or_else(|e| e.into_inner());
            if let Some(limiter) = limiters.get(&user_id) {
                return limiter.clone();
            }
        }

        let mut limiters = self.limiters.write().unwrap_or_else(|e| e.into_inner());
        limiters
            .entry(user_id)
            .or_insert_with(|| {
                let quota = Quota::per_minute(
                    NonZeroU32::new(self.rate_limit_per_minute).unwrap_or(DEFAULT_PER_MINUTE),
                );
                Arc::new(GovRateLimiter::direct(quota))
            })
            .clone()
    }

    /// `Err(retry_after_secs)` when the account is over its quota.
    pub fn check(&self, user_id: Uuid) -> Result<(), u64> {
        let limiter = self.get_or_create_limiter(user_id);
        match limiter.check() {
            Ok(_) => Ok(()),
            Err(not_until) => {
                let wait = not_until.wait_time_from(DefaultClock::default().now());
                Err(wait.as_secs().max(1))
            }
        }
    }

    pub fn tracked_accounts(&self) -> usize {
        self.limiters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }
}

impl std::fmt::Debug for RateLimiterState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiterState")
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("active_limiters", &self.tracked_accounts())
            .finish()
    }
}

/// Throttles authenticated requests per account.
///
/// Must run after `require_auth` so the [`CurrentUser`] is in extensions.
pub async fn throttle_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(user_id) = req.extensions().get::<CurrentUser>().map(|u| u.user_id) else {
        return next.run(req).await;
    };

    if let Some(throttle) = &state.throttle {
        if let Err(retry_after_secs) = throttle.check(user_id) {
            metrics::counter!("rate_limit_rejections_total", "policy" => "api").increment(1);
            return ApiError::RateLimited { retry_after_secs }.into_response();
        }
    }

    next.run(req).await
}

/// Counts a hit against a fixed-window policy and fails with 429 when exceeded.
pub async fn enforce(
    state: &AppState,
    policy_name: &str,
    key: &str,
    policy: RateLimitPolicy,
) -> Result<(), ApiError> {
    match state.limiter.check(policy_name, key, policy).await {
        RateDecision::Allowed { .. } => Ok(()),
        RateDecision::Limited { retry_after_secs } => {
            tracing::info!(policy = policy_name, key = key, "Rate limit exceeded");
            Err(ApiError::RateLimited { retry_after_secs })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_allows_within_quota() {
        let state = RateLimiterState::new(10);
        let user = Uuid::new_v4();
        for _ in 0..10 {
            assert!(state.check(user).is_ok());
        }
    }

    #[test]
    fn test_throttle_exhaustion_returns_retry_after() {
        let state = RateLimiterState::new(2);
        let user = Uuid::new_v4();
        assert!(state.check(user).is_ok());
        assert!(state.check(user).is_ok());
        let retry_after = state.check(user).unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_throttle_is_per_account() {
        let state = RateLimiterState::new(1);
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert!(state.check(a).is_ok());
        assert!(state.check(a).is_err());
        assert!(state.check(b).is_ok());
        assert_eq!(state.tracked_accounts(), 2);
    }

    #[test]
    fn test_zero_limit_falls_back_to_default() {
        let state = RateLimiterState::new(0);
        let user = Uuid::new_v4();
        for _ in 0..50 {
            assert!(state.check(user).is_ok());
        }
    }
}
