//! Webhook event repository.

use domain::models::webhook_event::NewWebhookEvent;
use sqlx::PgPool;
use uuid::Uuid;

use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct WebhookEventRepository {
    pool: PgPool,
}

impl WebhookEventRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, event: &NewWebhookEvent) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("insert_webhook_event");
        let result = sqlx::query_scalar(
            r#"
            INSERT INTO webhook_events
                (provider, event_type, external_id, signature_valid, payload, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(event.provider.as_str())
        .bind(event.event_type.as_deref())
        .bind(event.external_id.as_deref())
        .bind(event.signature_valid)
        .bind(&event.payload)
        .bind(event.initial_status().as_str())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn mark_processed(&self, id: Uuid) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("mark_webhook_processed");
        sqlx::query(
            "UPDATE webhook_events SET status = 'processed', processed_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }

    pub async fn mark_failed(&self, id: Uuid, error: &str) -> Result<(), sqlx::Error> {
        let timer = QueryTimer::new("mark_webhook_failed");
        sqlx::query(
            r#"
            UPDATE webhook_events
            SET status = 'failed', error = $2, processed_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(error)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(())
    }
}
