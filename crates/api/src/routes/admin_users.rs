//! Admin account listing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::user::UserFilter;
use domain::models::{User, UserSummary};
use persistence::repositories::UserRepository;
use shared::pagination::PageParams;
use uuid::Uuid;

use crate::app::AppState;
use crate::error::ApiError;
use crate::routes::Paginated;

/// GET /api/admin/users?role=&status=&search=&page=&perPage=
pub async fn list_users(
    State(state): State<AppState>,
    Query(filter): Query<UserFilter>,
    Query(page): Query<PageParams>,
) -> Result<Json<Paginated<UserSummary>>, ApiError> {
    let (users, total) = UserRepository::new(state.pool.clone())
        .list(&filter, &page)
        .await?;

    Ok(Json(Paginated {
        data: users.into_iter().map(|u| User::from(u).summary()).collect(),
        pagination: page.meta(total),
    }))
}

/// GET /api/admin/users/:id
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let user = UserRepository::new(state.pool.clone())
        .find_by_id(id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(Json(user.into()))
}
