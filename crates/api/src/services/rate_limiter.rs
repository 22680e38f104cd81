//! Fixed-window rate limiting for sensitive endpoints.
//!
//! Each policy allows `max_requests` hits per key inside a window of
//! `window_secs`, counted from the first hit. Counters live either in process
//! memory (lost on restart) or in Redis, where `INCR` and `PEXPIRE` run in one
//! Lua script so concurrent instances share the same window.
//!
//! Backend failures never block a request: they are logged and the request
//! is allowed.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use metrics::counter;
use redis::aio::ConnectionManager;
use thiserror::Error;
use tracing::warn;

use crate::config::RateLimitPolicy;

const WINDOW_SCRIPT: &str = r"
local count = redis.call('INCR', KEYS[1])
if count == 1 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
end
local ttl = redis.call('PTTL', KEYS[1])
if ttl < 0 then
    redis.call('PEXPIRE', KEYS[1], ARGV[1])
    ttl = tonumber(ARGV[1])
end
return {count, ttl}
";

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Outcome of counting one hit against a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

impl RateDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateDecision::Allowed { .. })
    }

    fn from_count(count: u64, max_requests: u32, remaining_window: Duration) -> Self {
        if count <= u64::from(max_requests) {
            RateDecision::Allowed {
                remaining: max_requests.saturating_sub(count as u32),
            }
        } else {
            RateDecision::Limited {
                retry_after_secs: remaining_window.as_secs_f64().ceil().max(1.0) as u64,
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started_at: Instant,
    length: Duration,
}

/// Process-local windows keyed by `policy:key`.
#[derive(Debug, Default)]
pub struct MemoryWindows {
    windows: Mutex<HashMap<String, Window>>,
}

impl MemoryWindows {
    pub fn check_at(&self, key: &str, policy: RateLimitPolicy, now: Instant) -> RateDecision {
        let length = Duration::from_secs(policy.window_secs);
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());

        let window = windows.entry(key.to_string()).or_insert(Window {
            count: 0,
            started_at: now,
            length,
        });
        if now.saturating_duration_since(window.started_at) >= window.length {
            *window = Window {
                count: 0,
                started_at: now,
                length,
            };
        }
        window.count += 1;

        let elapsed = now.saturating_duration_since(window.started_at);
        RateDecision::from_count(
            window.count,
            policy.max_requests,
            window.length.saturating_sub(elapsed),
        )
    }

    /// Drops windows that have ended. Returns how many were removed.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        let before = windows.len();
        windows.retain(|_, w| now.saturating_duration_since(w.started_at) < w.length);
        before - windows.len()
    }

    pub fn len(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

enum Backend {
    Memory(MemoryWindows),
    Redis(ConnectionManager),
}

pub struct FixedWindowLimiter {
    backend: Backend,
}

impl std::fmt::Debug for FixedWindowLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FixedWindowLimiter")
            .field("backend", &self.backend_name())
            .finish()
    }
}

impl FixedWindowLimiter {
    pub fn memory() -> Self {
        Self {
            backend: Backend::Memory(MemoryWindows::default()),
        }
    }

    pub async fn redis(url: &str) -> Result<Self, RateLimitError> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self {
            backend: Backend::Redis(manager),
        })
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
        }
    }

    /// Counts a hit for `key` under `policy_name` and decides whether it may proceed.
    pub async fn check(&self, policy_name: &str, key: &str, policy: RateLimitPolicy) -> RateDecision {
        let window_key = format!("rl:{}:{}", policy_name, key);

        let decision = match &self.backend {
            Backend::Memory(windows) => windows.check_at(&window_key, policy, Instant::now()),
            Backend::Redis(manager) => match redis_hit(manager.clone(), &window_key, policy).await {
                Ok(decision) => decision,
                Err(e) => {
                    warn!(policy = policy_name, error = %e, "Rate limit backend unavailable, allowing request");
                    RateDecision::Allowed {
                        remaining: policy.max_requests,
                    }
                }
            },
        };

        if !decision.is_allowed() {
            counter!("rate_limit_rejections_total", "policy" => policy_name.to_string())
                .increment(1);
        }
        decision
    }

    /// Drops expired in-memory windows. Redis expires its own keys.
    pub fn sweep(&self) -> usize {
        match &self.backend {
            Backend::Memory(windows) => windows.sweep_at(Instant::now()),
            Backend::Redis(_) => 0,
        }
    }
}

async fn redis_hit(
    mut manager: ConnectionManager,
    key: &str,
    policy: RateLimitPolicy,
) -> Result<RateDecision, RateLimitError> {
    let window_ms = policy.window_secs.saturating_mul(1000);
    let (count, ttl_ms): (i64, i64) = redis::Script::new(WINDOW_SCRIPT)
        .key(key)
        .arg(window_ms)
        .invoke_async(&mut manager)
        .await?;

    Ok(RateDecision::from_count(
        count.max(0) as u64,
        policy.max_requests,
        Duration::from_millis(ttl_ms.max(0) as u64),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: RateLimitPolicy = RateLimitPolicy::new(3, 60);

    #[test]
    fn test_allows_up_to_max_then_limits() {
        let windows = MemoryWindows::default();
        let now = Instant::now();

        assert_eq!(
            windows.check_at("k", POLICY, now),
            RateDecision::Allowed { remaining: 2 }
        );
        assert_eq!(
            windows.check_at("k", POLICY, now),
            RateDecision::Allowed { remaining: 1 }
        );
        assert_eq!(
            windows.check_at("k", POLICY, now),
            RateDecision::Allowed { remaining: 0 }
        );
        assert_eq!(
            windows.check_at("k", POLICY, now + Duration::from_secs(20)),
            RateDecision::Limited {
                retry_after_secs: 40
            }
        );
    }

    #[test]
    fn test_window_resets_after_it_elapses() {
        let windows = MemoryWindows::default();
        let start = Instant::now();
        for _ in 0..4 {
            windows.check_at("k", POLICY, start);
        }
        assert!(!windows.check_at("k", POLICY, start + Duration::from_secs(59)).is_allowed());

        let decision = windows.check_at("k", POLICY, start + Duration::from_secs(60));
        assert_eq!(decision, RateDecision::Allowed { remaining: 2 });
    }

    #[test]
    fn test_keys_are_independent() {
        let windows = MemoryWindows::default();
        let now = Instant::now();
        for _ in 0..3 {
            windows.check_at("a", POLICY, now);
        }
        assert!(!windows.check_at("a", POLICY, now).is_allowed());
        assert!(windows.check_at("b", POLICY, now).is_allowed());
    }

    #[test]
    fn test_sweep_removes_only_expired_windows() {
        let windows = MemoryWindows::default();
        let start = Instant::now();
        windows.check_at("old", POLICY, start);
        windows.check_at("new", POLICY, start + Duration::from_secs(30));

        assert_eq!(windows.sweep_at(start + Duration::from_secs(61)), 1);
        assert_eq!(windows.len(), 1);
    }

    #[test]
    fn test_retry_after_is_at_least_one_second() {
        let decision = RateDecision::from_count(10, 3, Duration::from_millis(200));
        assert_eq!(
            decision,
            RateDecision::Limited {
                retry_after_secs: 1
            }
        );
    }

    #[tokio::test]
    async fn test_memory_limiter_check() {
        let limiter = FixedWindowLimiter::memory();
        let policy = RateLimitPolicy::new(1, 60);
        assert!(limiter.check("login", "10.0.0.1", policy).await.is_allowed());
        assert!(!limiter.check("login", "10.0.0.1", policy).await.is_allowed());
        // Same key under another policy has its own window.
        assert!(limiter.check("lookup", "10.0.0.1", policy).await.is_allowed());
        assert_eq!(limiter.backend_name(), "memory");
    }
}
