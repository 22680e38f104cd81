//! Quote chat between a client and a supplier.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::chat::{CreateRoomRequest, MessagesQuery, PostMessageRequest};
use domain::models::{ChatMessage, ChatRoom, Role};
use persistence::repositories::{ChatRepository, SupplierRepository};
use tracing::debug;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::CurrentUser;
use crate::routes::quotes::visible_quote;
use crate::routes::supplier_profile;

async fn room_for(state: &AppState, current: &CurrentUser, id: Uuid) -> Result<ChatRoom, ApiError> {
    ChatRepository::new(state.pool.clone())
        .find_room(id)
        .await?
        .map(ChatRoom::from)
        .filter(|room| current.is_admin() || room.is_participant(current.user_id))
        .ok_or_else(|| ApiError::NotFound("Chat room not found".to_string()))
}

/// GET /api/chat/rooms
pub async fn list_rooms(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<Vec<ChatRoom>>, ApiError> {
    let rooms = ChatRepository::new(state.pool.clone())
        .list_rooms_for_participant(current.user_id)
        .await?;
    Ok(Json(rooms.into_iter().map(ChatRoom::from).collect()))
}

/// POST /api/chat/rooms
///
/// The quote owner opens a room with a chosen supplier; a supplier serving
/// the quote opens one for itself. Reopening returns the existing room.
pub async fn create_room(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<ChatRoom>, ApiError> {
    request.validate()?;
    let quote = visible_quote(&state, &current, request.cotacao_id).await?;

    let supplier_id = if current.role == Role::Supplier && !quote.is_owned_by(current.user_id) {
        supplier_profile(&state, &current).await?.id
    } else {
        let supplier_id = request.fornecedor_id.ok_or_else(|| {
            ApiError::Validation("fornecedorId is required".to_string())
        })?;
        SupplierRepository::new(state.pool.clone())
            .find_by_id(supplier_id)
            .await?
            .ok_or_else(|| ApiError::NotFound("Supplier not found".to_string()))?;
        supplier_id
    };

    let room = ChatRepository::new(state.pool.clone())
        .get_or_create_room(quote.id, quote.client_user_id, supplier_id)
        .await?;
    debug!(room_id = %room.id, quote_id = %quote.id, supplier_id = %supplier_id, "Chat room ready");
    Ok(Json(room.into()))
}

/// GET /api/chat/rooms/:id/messages?before=&limit=
pub async fn list_messages(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<ChatMessage>>, ApiError> {
    let room = room_for(&state, &current, id).await?;
    let messages = ChatRepository::new(state.pool.clone())
        .list_messages(room.id, query.before, query.limit())
        .await?;
    Ok(Json(messages.into_iter().map(ChatMessage::from).collect()))
}

/// POST /api/chat/rooms/:id/messages
///
/// Only participants post; admins can read but not write.
pub async fn post_message(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<Uuid>,
    Json(request): Json<PostMessageRequest>,
) -> Result<Json<ChatMessage>, ApiError> {
    request.validate()?;
    let room = room_for(&state, &current, id).await?;
    if !room.is_participant(current.user_id) {
        return Err(ApiError::Forbidden(
            "Only participants can post in this room".to_string(),
        ));
    }
    let body = request.body.trim();
    if body.is_empty() {
        return Err(ApiError::Validation("Message cannot be empty".to_string()));
    }

    let message = ChatRepository::new(state.pool.clone())
        .post_message(room.id, current.user_id, body)
        .await?;
    Ok(Json(message.into()))
}
