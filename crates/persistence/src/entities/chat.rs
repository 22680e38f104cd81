//! Chat entities.

use chrono::{DateTime, Utc};
use domain::models::{ChatMessage, ChatRoom};
use sqlx::FromRow;
use uuid::Uuid;

pub const ROOM_COLUMNS: &str = "r.id, r.cotacao_id, r.client_user_id, r.fornecedor_id, \
     f.user_id AS supplier_user_id, r.last_message_at, r.created_at";

#[derive(Debug, Clone, FromRow)]
pub struct ChatRoomEntity {
    pub id: Uuid,
    pub cotacao_id: Uuid,
    pub client_user_id: Uuid,
    pub fornecedor_id: Uuid,
    pub supplier_user_id: Option<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ChatRoomEntity> for ChatRoom {
    fn from(e: ChatRoomEntity) -> Self {
        Self {
            id: e.id,
            quote_id: e.cotacao_id,
            client_user_id: e.client_user_id,
            supplier_id: e.fornecedor_id,
            supplier_user_id: e.supplier_user_id,
            last_message_at: e.last_message_at,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessageEntity {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChatMessageEntity> for ChatMessage {
    fn from(e: ChatMessageEntity) -> Self {
        Self {
            id: e.id,
            room_id: e.room_id,
            sender_id: e.sender_id,
            body: e.body,
            created_at: e.created_at,
        }
    }
}
