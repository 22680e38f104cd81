//! Query timing and pool gauges, exported through the `metrics` facade.
//!
//! Nothing here installs a recorder. Without one (unit tests, tooling) every
//! call is a no-op.

use metrics::{gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

const QUERY_DURATION: &str = "database_query_duration_seconds";

/// Snapshot of the connection pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: u32,
    pub idle: u32,
}

impl PoolStats {
    pub fn of(pool: &PgPool) -> Self {
        Self {
            total: pool.size(),
            idle: pool.num_idle() as u32,
        }
    }

    pub fn in_use(&self) -> u32 {
        self.total.saturating_sub(self.idle)
    }
}

pub fn record_query_duration(query_name: &'static str, duration_secs: f64) {
    histogram!(QUERY_DURATION, "query" => query_name).record(duration_secs);
}

/// Publishes the pool gauges. Called by the periodic sampling job.
pub fn record_pool_metrics(pool: &PgPool) {
    let stats = PoolStats::of(pool);
    gauge!("database_connections_active").set(f64::from(stats.in_use()));
    gauge!("database_connections_idle").set(f64::from(stats.idle));
    gauge!("database_connections_total").set(f64::from(stats.total));
}

/// Times one repository call; `record` publishes the elapsed seconds under the
/// query's label.
#[must_use = "call `record` once the query has finished"]
pub struct QueryTimer {
    query_name: &'static str,
    started: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            started: Instant::now(),
        }
    }

    pub fn record(self) {
        record_query_duration(self.query_name, self.started.elapsed().as_secs_f64());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_use_never_underflows() {
        let stats = PoolStats { total: 2, idle: 5 };
        assert_eq!(stats.in_use(), 0);

        let stats = PoolStats { total: 10, idle: 4 };
        assert_eq!(stats.in_use(), 6);
    }

    #[test]
    fn test_timer_keeps_label() {
        let timer = QueryTimer::new("list_open_quotes");
        assert_eq!(timer.query_name, "list_open_quotes");
        timer.record();
    }
}
