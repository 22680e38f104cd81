//! Quote chat rooms between a client and a supplier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub const MAX_MESSAGE_LENGTH: u64 = 4000;

/// A conversation about one quote between its client and one supplier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRoom {
    pub id: Uuid,
    pub quote_id: Uuid,
    pub client_user_id: Uuid,
    pub supplier_id: Uuid,
    /// Account behind the supplier profile, when linked.
    pub supplier_user_id: Option<Uuid>,
    pub last_message_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl ChatRoom {
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.client_user_id == user_id || self.supplier_user_id == Some(user_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: Uuid,
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub cotacao_id: Uuid,
    /// Required when the client opens the room; a supplier opens rooms for itself.
    pub fornecedor_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    #[validate(length(min = 1, max = 4000, message = "Message must be between 1 and 4000 characters"))]
    pub body: String,
}

/// `GET /api/chat/rooms/:id/messages` query.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesQuery {
    /// Only messages created strictly before this instant.
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl MessagesQuery {
    pub fn limit(&self) -> i64 {
        self.limit.unwrap_or(50).clamp(1, 200)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_length_bounds() {
        assert!(PostMessageRequest { body: "Olá".into() }.validate().is_ok());
        assert!(PostMessageRequest { body: String::new() }.validate().is_err());
        let long = "a".repeat(MAX_MESSAGE_LENGTH as usize + 1);
        assert!(PostMessageRequest { body: long }.validate().is_err());
    }

    #[test]
    fn test_participants() {
        let client = Uuid::new_v4();
        let supplier_user = Uuid::new_v4();
        let room = ChatRoom {
            id: Uuid::new_v4(),
            quote_id: Uuid::new_v4(),
            client_user_id: client,
            supplier_id: Uuid::new_v4(),
            supplier_user_id: Some(supplier_user),
            last_message_at: None,
            created_at: Utc::now(),
        };
        assert!(room.is_participant(client));
        assert!(room.is_participant(supplier_user));
        assert!(!room.is_participant(Uuid::new_v4()));
    }

    #[test]
    fn test_messages_query_limit() {
        assert_eq!(MessagesQuery::default().limit(), 50);
        let q = MessagesQuery {
            before: None,
            limit: Some(1000),
        };
        assert_eq!(q.limit(), 200);
    }
}
