//! Orders (pedidos) created from accepted proposals.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::audit_log::actions;
use domain::models::order::UpdateOrderStatusRequest;
use domain::models::{AuditEntry, Order, OrderStatus, Role};
use persistence::entities::OrderEntity;
use persistence::repositories::{OrderRepository, OrderScope};
use serde_json::json;
use shared::pagination::PageParams;
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::routes::{supplier_profile, Paginated};
use crate::services::audit;

async fn scope_for(state: &AppState, current: &CurrentUser) -> Result<OrderScope, ApiError> {
    Ok(match current.role {
        Role::Admin => OrderScope::All,
        Role::Client => OrderScope::Client(current.user_id),
        Role::Supplier => OrderScope::Supplier(supplier_profile(state, current).await?.id),
    })
}

fn in_scope(order: &OrderEntity, scope: OrderScope) -> bool {
    match scope {
        OrderScope::All => true,
        OrderScope::Client(user_id) => order.client_user_id == user_id,
        OrderScope::Supplier(supplier_id) => order.fornecedor_id == supplier_id,
    }
}

async fn load(state: &AppState, id: Uuid, scope: OrderScope) -> Result<OrderEntity, ApiError> {
    OrderRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .filter(|o| in_scope(o, scope))
        .ok_or_else(|| ApiError::NotFound("Order not found".to_string()))
}

/// GET /api/pedidos?page=&perPage=
pub async fn list_orders(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<Order>>, ApiError> {
    let scope = scope_for(&state, &current).await?;
    let (rows, total) = OrderRepository::new(state.pool.clone())
        .list(scope, &page)
        .await?;

    Ok(Json(Paginated {
        data: rows.into_iter().map(Order::from).collect(),
        pagination: page.meta(total),
    }))
}

/// GET /api/pedidos/:id
pub async fn get_order(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let scope = scope_for(&state, &current).await?;
    Ok(Json(load(&state, id, scope).await?.into()))
}

/// PATCH /api/pedidos/:id/status
///
/// Only the order's supplier or an admin may move it along.
pub async fn update_order_status(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateOrderStatusRequest>,
) -> Result<Json<Order>, ApiError> {
    let scope = match current.role {
        Role::Admin => OrderScope::All,
        Role::Supplier => OrderScope::Supplier(supplier_profile(&state, &current).await?.id),
        Role::Client => {
            return Err(ApiError::Forbidden(
                "Only the supplier can update the order status".to_string(),
            ))
        }
    };
    let order = load(&state, id, scope).await?;

    let current_status: OrderStatus = order
        .status
        .parse()
        .map_err(ApiError::Internal)?;
    let next = current_status
        .transition_to(request.status)
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let updated = OrderRepository::new(state.pool.clone())
        .update_status(id, current_status, next)
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("Order status changed concurrently; reload and retry".to_string())
        })?;

    info!(
        user_id = %current.user_id,
        order_id = %id,
        from = %current_status,
        to = %next,
        "Order status changed"
    );
    audit::record(
        &state.pool,
        AuditEntry::new(actions::ORDER_STATUS_CHANGE, "order")
            .by(current.user_id, current.email.clone())
            .on(id)
            .with_details(json!({ "from": current_status.as_str(), "to": next.as_str() }))
            .from_ip(ip),
    )
    .await;

    Ok(Json(updated.into()))
}
