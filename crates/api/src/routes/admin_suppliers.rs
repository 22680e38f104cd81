//! Admin supplier (fornecedor) management.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::audit_log::actions;
use domain::models::supplier::{
    CreateSupplierRequest, SupplierFields, SupplierFilter, UpdateSupplierRequest,
};
use domain::models::{AuditEntry, Supplier};
use persistence::repositories::{SupplierInput, SupplierRepository, UserRepository};
use serde_json::json;
use shared::pagination::PageParams;
use shared::validation::normalize_digits;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::routes::Paginated;
use crate::services::audit;

fn duplicate_cnpj(err: sqlx::Error) -> ApiError {
    match ApiError::from(err) {
        ApiError::Conflict(_) => {
            ApiError::Conflict("A supplier with this CNPJ already exists".to_string())
        }
        other => other,
    }
}

/// Column values for a partial supplier update. `active` is dropped unless
/// the caller may change it.
pub(crate) fn update_input<'a>(
    request: &'a UpdateSupplierRequest,
    phone: Option<&'a str>,
    allow_active: bool,
) -> SupplierInput<'a> {
    SupplierInput {
        user_id: None,
        company_name: request.company_name.as_deref().map(str::trim),
        trade_name: request.trade_name.as_deref(),
        email: request.email.as_deref(),
        phone,
        address: request.address.as_deref(),
        city: request.city.as_deref(),
        active: if allow_active { request.active } else { None },
        fields: SupplierFields::normalize(
            request.cnpj.as_deref(),
            request.uf.as_deref(),
            request.cep.as_deref(),
        ),
    }
}

async fn load(repo: &SupplierRepository, id: Uuid) -> Result<Supplier, ApiError> {
    repo.find_by_id(id)
        .await?
        .map(Supplier::from)
        .ok_or_else(|| ApiError::NotFound("Supplier not found".to_string()))
}

/// GET /api/admin/fornecedores?search=&grupoId=&uf=&active=&page=&perPage=
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(filter): Query<SupplierFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<Supplier>>, ApiError> {
    let (rows, total) = SupplierRepository::new(state.pool.clone())
        .list(&filter, &page)
        .await?;

    Ok(Json(Paginated {
        data: rows.into_iter().map(Supplier::from).collect(),
        pagination: page.meta(total),
    }))
}

/// GET /api/admin/fornecedores/:id
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Supplier>, ApiError> {
    let repo = SupplierRepository::new(state.pool.clone());
    Ok(Json(load(&repo, id).await?))
}

/// POST /api/admin/fornecedores
pub async fn create_supplier(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateSupplierRequest>,
) -> Result<Json<Supplier>, ApiError> {
    request.validate()?;

    if let Some(user_id) = request.user_id {
        UserRepository::new(state.pool.clone())
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Linked account not found".to_string()))?;
    }

    let phone = request.phone.as_deref().map(normalize_digits);
    let input = SupplierInput {
        user_id: request.user_id,
        company_name: Some(request.company_name.trim()),
        trade_name: request.trade_name.as_deref(),
        email: request.email.as_deref(),
        phone: phone.as_deref(),
        address: request.address.as_deref(),
        city: request.city.as_deref(),
        active: None,
        fields: SupplierFields::normalize(
            request.cnpj.as_deref(),
            request.uf.as_deref(),
            request.cep.as_deref(),
        ),
    };

    let repo = SupplierRepository::new(state.pool.clone());
    let id = repo
        .create(&input, &request.grupo_ids, &request.material_ids)
        .await
        .map_err(duplicate_cnpj)?;

    info!(admin_id = %admin.user_id, supplier_id = %id, "Supplier created");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::SUPPLIER_CREATE, "supplier")
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .with_details(json!({
                "companyName": request.company_name,
                "cnpj": input.fields.cnpj,
            }))
            .from_ip(ip),
    )
    .await;

    Ok(Json(load(&repo, id).await?))
}

/// PUT /api/admin/fornecedores/:id
pub async fn update_supplier(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateSupplierRequest>,
) -> Result<Json<Supplier>, ApiError> {
    request.validate()?;

    let phone = request.phone.as_deref().map(normalize_digits);
    let input = update_input(&request, phone.as_deref(), true);
    let repo = SupplierRepository::new(state.pool.clone());
    let updated = repo
        .update(
            id,
            &input,
            request.grupo_ids.as_deref(),
            request.material_ids.as_deref(),
        )
        .await
        .map_err(duplicate_cnpj)?;
    if !updated {
        return Err(ApiError::NotFound("Supplier not found".to_string()));
    }

    info!(admin_id = %admin.user_id, supplier_id = %id, "Supplier updated");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::SUPPLIER_UPDATE, "supplier")
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .with_details(json!({
                "active": request.active,
                "linksReplaced": request.grupo_ids.is_some() || request.material_ids.is_some(),
            }))
            .from_ip(ip),
    )
    .await;

    Ok(Json(load(&repo, id).await?))
}

/// DELETE /api/admin/fornecedores/:id
///
/// Suppliers with orders are kept for order history; deactivate them instead.
pub async fn delete_supplier(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let repo = SupplierRepository::new(state.pool.clone());
    let orders = repo.count_orders(id).await?;
    if orders > 0 {
        return Err(ApiError::Conflict(format!(
            "Supplier has {} order(s); deactivate it instead",
            orders
        )));
    }

    if !repo.delete(id).await? {
        return Err(ApiError::NotFound("Supplier not found".to_string()));
    }

    info!(admin_id = %admin.user_id, supplier_id = %id, "Supplier deleted");
    audit::record(
        &state.pool,
        AuditEntry::new(actions::SUPPLIER_DELETE, "supplier")
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .from_ip(ip),
    )
    .await;

    Ok(Json(json!({ "success": true })))
}
