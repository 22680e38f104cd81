//! Audit log domain models.
//!
//! Admin mutations and security-relevant account events are recorded as
//! `resource.operation` actions. Writing them is best-effort.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Action names recorded in `audit_logs.action`.
pub mod actions {
    pub const ACCOUNT_CREATE: &str = "account.create";
    pub const ACCOUNT_UPDATE: &str = "account.update";
    pub const ACCOUNT_DELETE: &str = "account.delete";
    pub const ACCOUNT_PASSWORD_RESET: &str = "account.password_reset";
    pub const AUTH_LOGIN: &str = "auth.login";
    pub const AUTH_LOGIN_FAILED: &str = "auth.login_failed";
    pub const AUTH_PASSWORD_CHANGE: &str = "auth.password_change";
    pub const TWO_FACTOR_ENABLE: &str = "two_factor.enable";
    pub const TWO_FACTOR_DISABLE: &str = "two_factor.disable";
    pub const SUPPLIER_CREATE: &str = "supplier.create";
    pub const SUPPLIER_UPDATE: &str = "supplier.update";
    pub const SUPPLIER_DELETE: &str = "supplier.delete";
    pub const CATALOG_CHANGE: &str = "catalog.change";
    pub const PROPOSAL_ACCEPT: &str = "proposal.accept";
    pub const ORDER_STATUS_CHANGE: &str = "order.status_change";
}

/// Entry about to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
}

impl AuditEntry {
    /// Starts an entry for `action` on a resource type.
    ///
    /// ```
    /// use domain::models::audit_log::{actions, AuditEntry};
    /// use uuid::Uuid;
    ///
    /// let entry = AuditEntry::new(actions::ACCOUNT_DELETE, "user")
    ///     .on(Uuid::nil())
    ///     .from_ip("10.0.0.1");
    /// assert_eq!(entry.resource_id.as_deref(), Some("00000000-0000-0000-0000-000000000000"));
    /// ```
    pub fn new(action: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            actor_id: None,
            actor_email: None,
            action: action.into(),
            resource_type: resource_type.into(),
            resource_id: None,
            details: None,
            ip_address: None,
        }
    }

    pub fn by(mut self, actor_id: Uuid, email: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id);
        self.actor_email = Some(email.into());
        self
    }

    pub fn on(mut self, resource_id: impl ToString) -> Self {
        self.resource_id = Some(resource_id.to_string());
        self
    }

    pub fn with_details(mut self, details: JsonValue) -> Self {
        self.details = Some(details);
        self
    }

    pub fn from_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// Stored audit log row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLog {
    pub id: Uuid,
    pub actor_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub action: String,
    pub resource_type: String,
    pub resource_id: Option<String>,
    pub details: Option<JsonValue>,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Query filters for `GET /api/admin/audit-logs`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogFilter {
    pub action: Option<String>,
    pub actor_id: Option<Uuid>,
    pub resource_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder() {
        let actor = Uuid::new_v4();
        let target = Uuid::new_v4();
        let entry = AuditEntry::new(actions::ACCOUNT_PASSWORD_RESET, "user")
            .by(actor, "admin@cc.com.br")
            .on(target)
            .with_details(json!({"generated": true}))
            .from_ip("203.0.113.9");

        assert_eq!(entry.action, "account.password_reset");
        assert_eq!(entry.actor_id, Some(actor));
        assert_eq!(entry.resource_id, Some(target.to_string()));
        assert_eq!(entry.details, Some(json!({"generated": true})));
        assert_eq!(entry.ip_address.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn test_new_has_no_actor() {
        let entry = AuditEntry::new(actions::AUTH_LOGIN_FAILED, "user");
        assert!(entry.actor_id.is_none());
        assert!(entry.resource_id.is_none());
    }
}
