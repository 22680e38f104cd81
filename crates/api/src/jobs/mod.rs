//! Background jobs.

mod expire_quotes;
mod pool_metrics;
mod rate_limit_sweep;
mod scheduler;

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::JobsConfig;
use crate::services::FixedWindowLimiter;

pub use expire_quotes::ExpireQuotesJob;
pub use pool_metrics::PoolMetricsJob;
pub use rate_limit_sweep::RateLimitSweepJob;
pub use scheduler::{run_once, Job, JobFrequency, JobScheduler};

/// Scheduler with every job registered, not yet started.
pub fn build_scheduler(
    config: &JobsConfig,
    pool: PgPool,
    limiter: Arc<FixedWindowLimiter>,
) -> JobScheduler {
    let mut scheduler = JobScheduler::new();
    scheduler.register(PoolMetricsJob::new(pool.clone()));
    scheduler.register(ExpireQuotesJob::new(
        pool,
        config.expire_quotes_interval_minutes,
    ));
    if limiter.backend_name() == "memory" {
        scheduler.register(RateLimitSweepJob::new(
            limiter,
            config.rate_limit_sweep_interval_secs,
        ));
    }
    scheduler
}
