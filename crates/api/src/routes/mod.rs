//! HTTP route handlers.

pub mod admin_accounts;
pub mod admin_catalog;
pub mod admin_stats;
pub mod admin_suppliers;
pub mod admin_users;
pub mod auth;
pub mod catalog;
pub mod chat;
pub mod frontend;
pub mod health;
pub mod lookups;
pub mod orders;
pub mod profiles;
pub mod proposals;
pub mod quotes;
pub mod two_factor;
pub mod webhooks;

use persistence::entities::{ClientEntity, SupplierEntity};
use persistence::repositories::{ClientRepository, SupplierRepository};
use serde::Serialize;
use shared::pagination::PageMeta;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;

/// Page of results with its pagination metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub pagination: PageMeta,
}

/// Supplier profile of the signed-in account.
pub(crate) async fn supplier_profile(
    state: &AppState,
    user: &CurrentUser,
) -> Result<SupplierEntity, ApiError> {
    SupplierRepository::new(state.pool.clone())
        .find_by_user_id(user.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("No supplier profile for this account".to_string()))
}

/// Client profile of the signed-in account.
pub(crate) async fn client_profile(
    state: &AppState,
    user: &CurrentUser,
) -> Result<ClientEntity, ApiError> {
    ClientRepository::new(state.pool.clone())
        .find_by_user_id(user.user_id)
        .await?
        .ok_or_else(|| ApiError::Forbidden("No client profile for this account".to_string()))
}
