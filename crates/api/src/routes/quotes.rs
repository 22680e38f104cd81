//! Quote (cotação) requests.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use domain::models::quote::{CreateQuoteRequest, QuoteFilter};
use domain::models::{Quote, Role};
use persistence::repositories::{QuoteRepository, SupplierRepository};
use shared::pagination::PageParams;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::middleware::metrics::record_quote_created;
use crate::routes::{supplier_profile, Paginated};

/// Loads a quote the caller may see: its owner, an admin, or a supplier
/// serving one of its grupos or materials.
pub(crate) async fn visible_quote(
    state: &AppState,
    current: &CurrentUser,
    id: Uuid,
) -> Result<Quote, ApiError> {
    let quote = QuoteRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;

    if current.is_admin() || quote.is_owned_by(current.user_id) {
        return Ok(quote);
    }
    if current.role == Role::Supplier {
        let supplier = supplier_profile(state, current).await?;
        if SupplierRepository::new(state.pool.clone())
            .serves_quote(supplier.id, quote.id)
            .await?
        {
            return Ok(quote);
        }
    }
    // Same answer as a missing quote.
    Err(ApiError::NotFound("Quote not found".to_string()))
}

/// POST /api/cotacoes
pub async fn create_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateQuoteRequest>,
) -> Result<Json<Quote>, ApiError> {
    current.require_role(Role::Client)?;
    request.validate()?;
    request
        .check_rules(Utc::now().date_naive())
        .map_err(ApiError::Validation)?;

    let repo = QuoteRepository::new(state.pool.clone());
    let id = repo.create(current.user_id, &request).await?;
    record_quote_created();
    info!(user_id = %current.user_id, quote_id = %id, items = request.items.len(), "Quote created");

    let quote = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;
    Ok(Json(quote))
}

/// GET /api/cotacoes?status=&page=&perPage=
///
/// Clients see their own quotes, suppliers the open quotes in their
/// catalog scope, admins everything.
pub async fn list_quotes(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<QuoteFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<Quote>>, ApiError> {
    let repo = QuoteRepository::new(state.pool.clone());
    let (quotes, total) = match current.role {
        Role::Admin => repo.list_all(filter.status, &page).await?,
        Role::Client => {
            repo.list_for_client(current.user_id, filter.status, &page)
                .await?
        }
        Role::Supplier => {
            let supplier = supplier_profile(&state, &current).await?;
            repo.list_open_for_supplier(supplier.id, &page).await?
        }
    };

    Ok(Json(Paginated {
        data: quotes,
        pagination: page.meta(total),
    }))
}

/// GET /api/cotacoes/:id
pub async fn get_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    Ok(Json(visible_quote(&state, &current, id).await?))
}

/// POST /api/cotacoes/:id/cancelar
pub async fn cancel_quote(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Quote>, ApiError> {
    let repo = QuoteRepository::new(state.pool.clone());
    let quote = repo
        .find_by_id(id)
        .await?
        .filter(|q| q.is_owned_by(current.user_id))
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;

    if !quote.status.can_cancel() || !repo.cancel(id).await? {
        return Err(ApiError::Conflict(format!(
            "Quote is {} and cannot be cancelled",
            quote.status
        )));
    }
    info!(user_id = %current.user_id, quote_id = %id, "Quote cancelled");

    let quote = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;
    Ok(Json(quote))
}
