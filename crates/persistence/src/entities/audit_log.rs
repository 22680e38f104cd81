//! Audit log entity.

use chrono::{DateTime, Utc};
use domain::models::AuditLog;
use sqlx::FromRow;
use uuid::Uuid;

/// Database entity for audit logs.
#[derive(Debug, Clone, FromRow)]
pub struct AuditLogEntity {
    pub id: Uuid,
    /// Account that performed the action, if any.
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    /// Action performed (format: resource.operation).
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<AuditLogEntity> for AuditLog {
    fn from(e: AuditLogEntity) -> Self {
        Self {
            id: e.id,
            actor_id: e.actor_id,
            actor_email: e.actor_email,
            action: e.action,
            resource_type: e.resource_type,
            resource_id: e.resource_id,
            details: e.details,
            ip_address: e.ip_address,
            created_at: e.created_at,
        }
    }
}
