//! Admin dashboard figures and audit log browsing.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::audit_log::AuditLogFilter;
use domain::models::stats::{AdminStats, QuoteStatusCounts, RoleCounts};
use domain::models::AuditLog;
use persistence::repositories::{
    AuditLogRepository, OrderRepository, QuoteRepository, SupplierRepository, UserRepository,
};
use shared::pagination::PageParams;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::Paginated;

/// GET /api/admin/stats
pub async fn get_stats(State(state): State<AppState>) -> Result<Json<AdminStats>, ApiError> {
    let pool = state.pool.clone();
    let users = UserRepository::new(pool.clone());
    let suppliers = SupplierRepository::new(pool.clone());
    let quotes = QuoteRepository::new(pool.clone());
    let orders = OrderRepository::new(pool);

    let (roles, supplier_count, quote_statuses, (order_count, gmv_cents)) = tokio::try_join!(
        users.count_by_role(),
        suppliers.count(),
        quotes.count_by_status(),
        orders.totals(),
    )?;

    Ok(Json(AdminStats {
        users: RoleCounts::from_rows(&roles),
        suppliers: supplier_count,
        quotes: QuoteStatusCounts::from_rows(&quote_statuses),
        orders: order_count,
        gmv_cents,
    }))
}

/// GET /api/admin/audit-logs?action=&actorId=&resourceType=&page=&perPage=
pub async fn list_audit_logs(
    State(state): State<AppState>,
    Query(filter): Query<AuditLogFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<AuditLog>>, ApiError> {
    let (rows, total) = AuditLogRepository::new(state.pool.clone())
        .list(&filter, &page)
        .await?;

    Ok(Json(Paginated {
        data: rows.into_iter().map(AuditLog::from).collect(),
        pagination: page.meta(total),
    }))
}
