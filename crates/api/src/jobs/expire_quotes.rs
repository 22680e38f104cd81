//! Marks open quotes past their deadline as expired.

use chrono::Utc;
use persistence::repositories::QuoteRepository;
use sqlx::PgPool;
use tracing::info;

use super::scheduler::{Job, JobFrequency};

pub struct ExpireQuotesJob {
    pool: PgPool,
    interval_minutes: u64,
}

impl ExpireQuotesJob {
    pub fn new(pool: PgPool, interval_minutes: u64) -> Self {
        Self {
            pool,
            interval_minutes,
        }
    }
}

#[async_trait::async_trait]
impl Job for ExpireQuotesJob {
    fn name(&self) -> &'static str {
        "expire_quotes"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::Minutes(self.interval_minutes)
    }

    /// A quote stays open through its deadline day.
    async fn execute(&self) -> Result<(), String> {
        let expired = QuoteRepository::new(self.pool.clone())
            .expire_past_deadline(Utc::now().date_naive())
            .await
            .map_err(|e| e.to_string())?;
        if expired > 0 {
            info!(count = expired, "Quotes expired");
            metrics::counter!("quotes_expired_total").increment(expired);
        }
        Ok(())
    }
}
