//! Active catalog for any signed-in account.

use axum::{
    extract::{Query, State},
    Json,
};
use domain::models::catalog::MaterialFilter;
use domain::models::{Grupo, Material};
use persistence::repositories::CatalogRepository;

use crate::app::AppState;
use crate::error::ApiError;

/// GET /api/grupos
pub async fn list_grupos(State(state): State<AppState>) -> Result<Json<Vec<Grupo>>, ApiError> {
    let grupos = CatalogRepository::new(state.pool.clone())
        .list_grupos(false)
        .await?;
    Ok(Json(grupos.into_iter().map(Grupo::from).collect()))
}

/// GET /api/materiais?grupoId=&search=
pub async fn list_materiais(
    State(state): State<AppState>,
    Query(filter): Query<MaterialFilter>,
) -> Result<Json<Vec<Material>>, ApiError> {
    let materiais = CatalogRepository::new(state.pool.clone())
        .list_materiais(filter.grupo_id, filter.search.as_deref(), false)
        .await?;
    Ok(Json(materiais.into_iter().map(Material::from).collect()))
}
