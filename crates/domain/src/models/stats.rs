//! Admin dashboard figures.

use serde::Serialize;

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleCounts {
    pub admin: i64,
    pub fornecedor: i64,
    pub cliente: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteStatusCounts {
    pub open: i64,
    pub responded: i64,
    pub closed: i64,
    pub cancelled: i64,
    pub expired: i64,
}

/// Response of `GET /api/admin/stats`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminStats {
    pub users: RoleCounts,
    pub suppliers: i64,
    pub quotes: QuoteStatusCounts,
    pub orders: i64,
    /// Sum of non-cancelled order totals, in centavos.
    pub gmv_cents: i64,
}

impl RoleCounts {
    /// Folds `(role, count)` rows. Unknown roles are ignored.
    pub fn from_rows<S: AsRef<str>>(rows: &[(S, i64)]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, (role, count)| {
            match role.as_ref() {
                "admin" => acc.admin += count,
                "fornecedor" => acc.fornecedor += count,
                "cliente" => acc.cliente += count,
                _ => {}
            }
            acc
        })
    }
}

impl QuoteStatusCounts {
    /// Folds `(status, count)` rows. Unknown statuses are ignored.
    pub fn from_rows<S: AsRef<str>>(rows: &[(S, i64)]) -> Self {
        rows.iter().fold(Self::default(), |mut acc, (status, count)| {
            match status.as_ref() {
                "open" => acc.open += count,
                "responded" => acc.responded += count,
                "closed" => acc.closed += count,
                "cancelled" => acc.cancelled += count,
                "expired" => acc.expired += count,
                _ => {}
            }
            acc
        })
    }
}
