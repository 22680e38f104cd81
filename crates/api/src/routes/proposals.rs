//! Supplier proposals on quotes and their acceptance.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use domain::models::audit_log::actions;
use domain::models::proposal::CreateProposalRequest;
use domain::models::{AuditEntry, Order, Proposal, Role};
use persistence::repositories::{AcceptOutcome, ProposalRepository, QuoteRepository, UserRepository};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::middleware::metrics::{record_order_created, record_proposal_submitted};
use crate::routes::quotes::visible_quote;
use crate::routes::supplier_profile;
use crate::services::audit;

/// POST /api/cotacoes/:id/propostas
pub async fn create_proposal(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(quote_id): Path<Uuid>,
    Json(request): Json<CreateProposalRequest>,
) -> Result<Json<Proposal>, ApiError> {
    if current.role != Role::Supplier {
        return Err(ApiError::Forbidden("Supplier role required".to_string()));
    }
    request.validate()?;
    let today = Utc::now().date_naive();
    if request.valid_until.is_some_and(|d| d < today) {
        return Err(ApiError::Validation(
            "Validity date cannot be in the past".to_string(),
        ));
    }

    let supplier = supplier_profile(&state, &current).await?;
    if !supplier.active {
        return Err(ApiError::Forbidden("Supplier is inactive".to_string()));
    }
    let quote = visible_quote(&state, &current, quote_id).await?;
    if !quote.status.accepts_proposals() {
        return Err(ApiError::Conflict(format!(
            "Quote is {} and no longer accepts proposals",
            quote.status
        )));
    }

    let repo = ProposalRepository::new(state.pool.clone());
    let id = repo
        .create(quote.id, supplier.id, &request)
        .await
        .map_err(|e| match ApiError::from(e) {
            ApiError::Conflict(_) => ApiError::Conflict(
                "You already sent a proposal for this quote".to_string(),
            ),
            other => other,
        })?;
    record_proposal_submitted();
    info!(supplier_id = %supplier.id, quote_id = %quote.id, proposal_id = %id, "Proposal submitted");

    match UserRepository::new(state.pool.clone())
        .find_by_id(quote.client_user_id)
        .await
    {
        Ok(Some(owner)) => {
            let message = state.email.new_proposal(
                &owner.email,
                &owner.name,
                &quote.title,
                &supplier.company_name,
            );
            state.email.send_in_background(message);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, quote_id = %quote.id, "Could not load quote owner for notification"),
    }

    let proposal = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proposal not found".to_string()))?;
    Ok(Json(proposal.into()))
}

/// GET /api/cotacoes/:id/propostas
///
/// The quote owner and admins see every proposal; a supplier sees only
/// its own.
pub async fn list_proposals(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(quote_id): Path<Uuid>,
) -> Result<Json<Vec<Proposal>>, ApiError> {
    let quote = QuoteRepository::new(state.pool.clone())
        .find_by_id(quote_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Quote not found".to_string()))?;

    let only_supplier = if current.is_admin() || quote.is_owned_by(current.user_id) {
        None
    } else if current.role == Role::Supplier {
        Some(supplier_profile(&state, &current).await?.id)
    } else {
        return Err(ApiError::NotFound("Quote not found".to_string()));
    };

    let proposals = ProposalRepository::new(state.pool.clone())
        .list_for_quote(quote.id, only_supplier)
        .await?;
    Ok(Json(proposals.into_iter().map(Proposal::from).collect()))
}

/// POST /api/propostas/:id/aceitar
pub async fn accept_proposal(
    State(state): State<AppState>,
    current: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> Result<Json<Order>, ApiError> {
    let repo = ProposalRepository::new(state.pool.clone());
    let proposal = repo
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Proposal not found".to_string()))?;

    let quote = QuoteRepository::new(state.pool.clone())
        .find_by_id(proposal.cotacao_id)
        .await?
        .filter(|q| q.is_owned_by(current.user_id))
        .ok_or_else(|| ApiError::NotFound("Proposal not found".to_string()))?;

    let order = match repo.accept(id).await? {
        AcceptOutcome::Accepted(order) => order,
        AcceptOutcome::NotFound => {
            return Err(ApiError::NotFound("Proposal not found".to_string()))
        }
        AcceptOutcome::ProposalNotPending => {
            return Err(ApiError::Conflict(
                "Proposal is no longer pending".to_string(),
            ))
        }
        AcceptOutcome::QuoteNotOpen => {
            return Err(ApiError::Conflict(
                "Quote no longer accepts proposals".to_string(),
            ))
        }
    };

    record_order_created();
    info!(
        user_id = %current.user_id,
        quote_id = %quote.id,
        proposal_id = %id,
        order_id = %order.id,
        "Proposal accepted"
    );
    audit::record(
        &state.pool,
        AuditEntry::new(actions::PROPOSAL_ACCEPT, "proposal")
            .by(current.user_id, current.email.clone())
            .on(id)
            .with_details(json!({
                "quoteId": quote.id,
                "orderId": order.id,
                "totalCents": order.total_cents,
            }))
            .from_ip(ip),
    )
    .await;

    Ok(Json(order.into()))
}
