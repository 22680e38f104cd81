//! Audit log repository.

use domain::models::audit_log::{AuditEntry, AuditLogFilter};
use shared::pagination::PageParams;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::AuditLogEntity;
use crate::metrics::QueryTimer;

const AUDIT_COLUMNS: &str = "id, actor_id, actor_email, action, resource_type, resource_id, \
     details, ip_address, created_at";

#[derive(Clone)]
pub struct AuditLogRepository {
    pool: PgPool,
}

impl AuditLogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert(&self, entry: &AuditEntry) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("insert_audit_log");
        let result = sqlx::query_scalar(
            r#"
            INSERT INTO audit_logs
                (actor_id, actor_email, action, resource_type, resource_id, details, ip_address)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(entry.actor_id)
        .bind(entry.actor_email.as_deref())
        .bind(&entry.action)
        .bind(&entry.resource_type)
        .bind(entry.resource_id.as_deref())
        .bind(entry.details.as_ref())
        .bind(entry.ip_address.as_deref())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Most recent entries first.
    pub async fn list(
        &self,
        filter: &AuditLogFilter,
        page: &PageParams,
    ) -> Result<(Vec<AuditLogEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_audit_logs");
        let where_clause = r#"
            WHERE ($1::text IS NULL OR action = $1)
              AND ($2::uuid IS NULL OR actor_id = $2)
              AND ($3::text IS NULL OR resource_type = $3)
        "#;

        let rows = sqlx::query_as::<_, AuditLogEntity>(&format!(
            "SELECT {} FROM audit_logs {} ORDER BY created_at DESC LIMIT $4 OFFSET $5",
            AUDIT_COLUMNS, where_clause
        ))
        .bind(filter.action.as_deref())
        .bind(filter.actor_id)
        .bind(filter.resource_type.as_deref())
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM audit_logs {}", where_clause))
                .bind(filter.action.as_deref())
                .bind(filter.actor_id)
                .bind(filter.resource_type.as_deref())
                .fetch_one(&self.pool)
                .await?;

        timer.record();
        Ok((rows, total))
    }
}
