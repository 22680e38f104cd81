//! Chat repository.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::chat::ROOM_COLUMNS;
use crate::entities::{ChatMessageEntity, ChatRoomEntity};
use crate::metrics::QueryTimer;

#[derive(Clone)]
pub struct ChatRepository {
    pool: PgPool,
}

impl ChatRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the room for a quote/supplier pair, creating it if needed.
    pub async fn get_or_create_room(
        &self,
        quote_id: Uuid,
        client_user_id: Uuid,
        supplier_id: Uuid,
    ) -> Result<ChatRoomEntity, sqlx::Error> {
        let timer = QueryTimer::new("get_or_create_chat_room");
        sqlx::query(
            r#"
            INSERT INTO chat_rooms (cotacao_id, client_user_id, fornecedor_id)
            VALUES ($1, $2, $3)
            ON CONFLICT (cotacao_id, fornecedor_id) DO NOTHING
            "#,
        )
        .bind(quote_id)
        .bind(client_user_id)
        .bind(supplier_id)
        .execute(&self.pool)
        .await?;

        let result = sqlx::query_as::<_, ChatRoomEntity>(&format!(
            r#"
            SELECT {} FROM chat_rooms r
            JOIN fornecedores f ON f.id = r.fornecedor_id
            WHERE r.cotacao_id = $1 AND r.fornecedor_id = $2
            "#,
            ROOM_COLUMNS
        ))
        .bind(quote_id)
        .bind(supplier_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_room(&self, id: Uuid) -> Result<Option<ChatRoomEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_chat_room");
        let result = sqlx::query_as::<_, ChatRoomEntity>(&format!(
            "SELECT {} FROM chat_rooms r JOIN fornecedores f ON f.id = r.fornecedor_id WHERE r.id = $1",
            ROOM_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Rooms where the account is the client or the supplier's user.
    pub async fn list_rooms_for_participant(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<ChatRoomEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_chat_rooms");
        let result = sqlx::query_as::<_, ChatRoomEntity>(&format!(
            r#"
            SELECT {} FROM chat_rooms r
            JOIN fornecedores f ON f.id = r.fornecedor_id
            WHERE r.client_user_id = $1 OR f.user_id = $1
            ORDER BY COALESCE(r.last_message_at, r.created_at) DESC
            "#,
            ROOM_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Newest messages first, optionally before a point in time.
    pub async fn list_messages(
        &self,
        room_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<ChatMessageEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_chat_messages");
        let result = sqlx::query_as::<_, ChatMessageEntity>(
            r#"
            SELECT id, room_id, sender_id, body, created_at
            FROM chat_messages
            WHERE room_id = $1 AND ($2::timestamptz IS NULL OR created_at < $2)
            ORDER BY created_at DESC
            LIMIT $3
            "#,
        )
        .bind(room_id)
        .bind(before)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn post_message(
        &self,
        room_id: Uuid,
        sender_id: Uuid,
        body: &str,
    ) -> Result<ChatMessageEntity, sqlx::Error> {
        let timer = QueryTimer::new("post_chat_message");
        let mut tx = self.pool.begin().await?;

        let message = sqlx::query_as::<_, ChatMessageEntity>(
            r#"
            INSERT INTO chat_messages (room_id, sender_id, body)
            VALUES ($1, $2, $3)
            RETURNING id, room_id, sender_id, body, created_at
            "#,
        )
        .bind(room_id)
        .bind(sender_id)
        .bind(body)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("UPDATE chat_rooms SET last_message_at = $2 WHERE id = $1")
            .bind(room_id)
            .bind(message.created_at)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        timer.record();
        Ok(message)
    }
}
