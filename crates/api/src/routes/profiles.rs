//! Self-service profiles for suppliers and clients.

use axum::{extract::State, Json};
use domain::models::client::UpdateClientRequest;
use domain::models::supplier::UpdateSupplierRequest;
use domain::models::{Client, Role, Supplier};
use persistence::repositories::{ClientRepository, SupplierRepository};
use shared::validation::normalize_digits;
use tracing::info;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::routes::admin_suppliers::update_input;
use crate::routes::{client_profile, supplier_profile};

/// GET /api/fornecedor/perfil
pub async fn get_supplier_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Supplier>, ApiError> {
    current.require_role(Role::Supplier)?;
    Ok(Json(supplier_profile(&state, &current).await?.into()))
}

/// PUT /api/fornecedor/perfil
///
/// Same fields as the admin update except `active`.
pub async fn update_supplier_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateSupplierRequest>,
) -> Result<Json<Supplier>, ApiError> {
    current.require_role(Role::Supplier)?;
    request.validate()?;
    let profile = supplier_profile(&state, &current).await?;

    let phone = request.phone.as_deref().map(normalize_digits);
    let input = update_input(&request, phone.as_deref(), false);
    let repo = SupplierRepository::new(state.pool.clone());
    repo.update(
        profile.id,
        &input,
        request.grupo_ids.as_deref(),
        request.material_ids.as_deref(),
    )
    .await
    .map_err(|e| match ApiError::from(e) {
        ApiError::Conflict(_) => {
            ApiError::Conflict("A supplier with this CNPJ already exists".to_string())
        }
        other => other,
    })?;

    info!(user_id = %current.user_id, supplier_id = %profile.id, "Supplier profile updated");

    let updated = repo
        .find_by_id(profile.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Supplier not found".to_string()))?;
    Ok(Json(updated.into()))
}

/// GET /api/cliente/perfil
pub async fn get_client_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Client>, ApiError> {
    current.require_role(Role::Client)?;
    Ok(Json(client_profile(&state, &current).await?.into()))
}

/// PUT /api/cliente/perfil
pub async fn update_client_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<UpdateClientRequest>,
) -> Result<Json<Client>, ApiError> {
    current.require_role(Role::Client)?;
    request.validate()?;

    let document = request.document.as_deref().map(normalize_digits);
    let phone = request.phone.as_deref().map(normalize_digits);
    let uf = request.uf.as_deref().map(|u| u.trim().to_uppercase());

    let updated = ClientRepository::new(state.pool.clone())
        .update(
            current.user_id,
            request.name.as_deref().map(str::trim),
            document.as_deref(),
            phone.as_deref(),
            request.city.as_deref(),
            uf.as_deref(),
        )
        .await?
        .ok_or_else(|| ApiError::Forbidden("No client profile for this account".to_string()))?;

    info!(user_id = %current.user_id, client_id = %updated.id, "Client profile updated");
    Ok(Json(updated.into()))
}
