//! Drops expired in-memory rate limit windows.

use std::sync::Arc;

use tracing::debug;

use super::scheduler::{Job, JobFrequency};
use crate::services::FixedWindowLimiter;

pub struct RateLimitSweepJob {
    limiter: Arc<FixedWindowLimiter>,
    interval_secs: u64,
}

impl RateLimitSweepJob {
    pub fn new(limiter: Arc<FixedWindowLimiter>, interval_secs: u64) -> Self {
        Self {
            limiter,
            interval_secs,
        }
    }
}

#[async_trait::async_trait]
impl Job for RateLimitSweepJob {
    fn name(&self) -> &'static str {
        "rate_limit_sweep"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Seconds(self.interval_secs)
    }

    async fn execute(&self) -> Result<(), String> {
        let removed = self.limiter.sweep();
        if removed > 0 {
            debug!(removed = removed, "Expired rate limit windows dropped");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::scheduler::run_once;

    #[tokio::test]
    async fn test_sweep_job_runs_on_memory_backend() {
        let job = RateLimitSweepJob::new(Arc::new(FixedWindowLimiter::memory()), 60);
        assert_eq!(job.frequency(), JobFrequency::Seconds(60));
        assert!(run_once(&job).await);
    }
}
