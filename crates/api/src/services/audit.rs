//! Best-effort audit trail.

use domain::models::AuditEntry;
use persistence::repositories::AuditLogRepository;
use sqlx::PgPool;
use tracing::warn;

/// Persists an audit entry. A failed insert is logged and otherwise ignored
/// so the audited operation still succeeds.
pub async fn record(pool: &PgPool, entry: AuditEntry) {
    let repo = AuditLogRepository::new(pool.clone());
    if let Err(e) = repo.insert(&entry).await {
        warn!(
            action = %entry.action,
            resource_type = %entry.resource_type,
            resource_id = ?entry.resource_id,
            error = %e,
            "Failed to write audit log"
        );
    }
}
