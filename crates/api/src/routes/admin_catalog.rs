//! Admin catalog management for grupos and materiais.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::audit_log::actions;
use domain::models::catalog::{
    CreateGrupoRequest, CreateMaterialRequest, MaterialFilter, UpdateGrupoRequest,
    UpdateMaterialRequest,
};
use domain::models::{AuditEntry, Grupo, Material};
use persistence::repositories::CatalogRepository;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::{ClientIp, CurrentUser};
use crate::services::audit;

/// Maps foreign-key failures on catalog writes to a conflict.
fn catalog_error(err: sqlx::Error, what: &str) -> ApiError {
    if let sqlx::Error::Database(db_err) = &err {
        match db_err.code().as_deref() {
            Some("23503") => {
                return ApiError::Conflict(format!("{} is in use or references a missing grupo", what))
            }
            Some("23505") => return ApiError::Conflict(format!("{} already exists", what)),
            _ => {}
        }
    }
    ApiError::from(err)
}

async fn record_change(
    state: &AppState,
    admin: &CurrentUser,
    ip: String,
    resource_type: &str,
    id: Uuid,
    operation: &str,
    details: Value,
) {
    let mut details = details;
    if let Value::Object(map) = &mut details {
        map.insert("operation".to_string(), json!(operation));
    }
    audit::record(
        &state.pool,
        AuditEntry::new(actions::CATALOG_CHANGE, resource_type)
            .by(admin.user_id, admin.email.clone())
            .on(id)
            .with_details(details)
            .from_ip(ip),
    )
    .await;
}

/// GET /api/admin/grupos (includes inactive)
pub async fn list_grupos(State(state): State<AppState>) -> Result<Json<Vec<Grupo>>, ApiError> {
    let grupos = CatalogRepository::new(state.pool.clone())
        .list_grupos(true)
        .await?;
    Ok(Json(grupos.into_iter().map(Grupo::from).collect()))
}

/// POST /api/admin/grupos
pub async fn create_grupo(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateGrupoRequest>,
) -> Result<Json<Grupo>, ApiError> {
    request.validate()?;
    let grupo = CatalogRepository::new(state.pool.clone())
        .create_grupo(request.name.trim(), request.description.as_deref())
        .await
        .map_err(|e| catalog_error(e, "Grupo"))?;

    info!(admin_id = %admin.user_id, grupo_id = %grupo.id, "Grupo created");
    record_change(&state, &admin, ip, "grupo", grupo.id, "create", json!({ "name": grupo.name })).await;
    Ok(Json(grupo.into()))
}

/// PUT /api/admin/grupos/:id
pub async fn update_grupo(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateGrupoRequest>,
) -> Result<Json<Grupo>, ApiError> {
    request.validate()?;
    let grupo = CatalogRepository::new(state.pool.clone())
        .update_grupo(
            id,
            request.name.as_deref().map(str::trim),
            request.description.as_deref(),
            request.active,
        )
        .await
        .map_err(|e| catalog_error(e, "Grupo"))?
        .ok_or_else(|| ApiError::NotFound("Grupo not found".to_string()))?;

    record_change(&state, &admin, ip, "grupo", id, "update", json!({ "active": request.active })).await;
    Ok(Json(grupo.into()))
}

/// DELETE /api/admin/grupos/:id
pub async fn delete_grupo(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = CatalogRepository::new(state.pool.clone())
        .delete_grupo(id)
        .await
        .map_err(|e| catalog_error(e, "Grupo"))?;
    if !deleted {
        return Err(ApiError::NotFound("Grupo not found".to_string()));
    }

    info!(admin_id = %admin.user_id, grupo_id = %id, "Grupo deleted");
    record_change(&state, &admin, ip, "grupo", id, "delete", json!({})).await;
    Ok(Json(json!({ "success": true })))
}

/// GET /api/admin/materiais?grupoId=&search= (includes inactive)
pub async fn list_materiais(
    State(state): State<AppState>,
    Query(filter): Query<MaterialFilter>,
) -> Result<Json<Vec<Material>>, ApiError> {
    let materiais = CatalogRepository::new(state.pool.clone())
        .list_materiais(filter.grupo_id, filter.search.as_deref(), true)
        .await?;
    Ok(Json(materiais.into_iter().map(Material::from).collect()))
}

/// POST /api/admin/materiais
pub async fn create_material(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Json(request): Json<CreateMaterialRequest>,
) -> Result<Json<Material>, ApiError> {
    request.validate()?;
    let material = CatalogRepository::new(state.pool.clone())
        .create_material(
            request.grupo_id,
            request.name.trim(),
            request.description.as_deref(),
            request.unit.trim(),
        )
        .await
        .map_err(|e| catalog_error(e, "Material"))?;

    info!(admin_id = %admin.user_id, material_id = %material.id, "Material created");
    record_change(
        &state,
        &admin,
        ip,
        "material",
        material.id,
        "create",
        json!({ "name": material.name, "grupoId": material.grupo_id }),
    )
    .await;
    Ok(Json(material.into()))
}

/// PUT /api/admin/materiais/:id
pub async fn update_material(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMaterialRequest>,
) -> Result<Json<Material>, ApiError> {
    request.validate()?;
    let material = CatalogRepository::new(state.pool.clone())
        .update_material(
            id,
            request.grupo_id,
            request.name.as_deref().map(str::trim),
            request.description.as_deref(),
            request.unit.as_deref().map(str::trim),
            request.active,
        )
        .await
        .map_err(|e| catalog_error(e, "Material"))?
        .ok_or_else(|| ApiError::NotFound("Material not found".to_string()))?;

    record_change(&state, &admin, ip, "material", id, "update", json!({ "active": request.active })).await;
    Ok(Json(material.into()))
}

/// DELETE /api/admin/materiais/:id
pub async fn delete_material(
    State(state): State<AppState>,
    admin: CurrentUser,
    ClientIp(ip): ClientIp,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    let deleted = CatalogRepository::new(state.pool.clone())
        .delete_material(id)
        .await
        .map_err(|e| catalog_error(e, "Material"))?;
    if !deleted {
        return Err(ApiError::NotFound("Material not found".to_string()));
    }

    info!(admin_id = %admin.user_id, material_id = %id, "Material deleted");
    record_change(&state, &admin, ip, "material", id, "delete", json!({})).await;
    Ok(Json(json!({ "success": true })))
}
