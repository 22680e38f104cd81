//! Order repository.

use domain::models::{OrderStatus, PaymentStatus};
use shared::pagination::PageParams;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::quote::ORDER_COLUMNS;
use crate::entities::OrderEntity;
use crate::metrics::QueryTimer;

/// Whose orders to list.
#[derive(Debug, Clone, Copy)]
pub enum OrderScope {
    Client(Uuid),
    Supplier(Uuid),
    All,
}

#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list(
        &self,
        scope: OrderScope,
        page: &PageParams,
    ) -> Result<(Vec<OrderEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_orders");
        let (client, supplier) = match scope {
            OrderScope::Client(id) => (Some(id), None),
            OrderScope::Supplier(id) => (None, Some(id)),
            OrderScope::All => (None, None),
        };
        let where_clause = r#"
            WHERE ($1::uuid IS NULL OR client_user_id = $1)
              AND ($2::uuid IS NULL OR fornecedor_id = $2)
        "#;

        let rows = sqlx::query_as::<_, OrderEntity>(&format!(
            "SELECT {} FROM pedidos {} ORDER BY created_at DESC LIMIT $3 OFFSET $4",
            ORDER_COLUMNS, where_clause
        ))
        .bind(client)
        .bind(supplier)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM pedidos {}", where_clause))
                .bind(client)
                .bind(supplier)
                .fetch_one(&self.pool)
                .await?;

        timer.record();
        Ok((rows, total))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<OrderEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_order_by_id");
        let result = sqlx::query_as::<_, OrderEntity>(&format!(
            "SELECT {} FROM pedidos WHERE id = $1",
            ORDER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Moves the order to `next` only if it is still in `current`.
    pub async fn update_status(
        &self,
        id: Uuid,
        current: OrderStatus,
        next: OrderStatus,
    ) -> Result<Option<OrderEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_order_status");
        let result = sqlx::query_as::<_, OrderEntity>(&format!(
            r#"
            UPDATE pedidos SET status = $3, updated_at = NOW()
            WHERE id = $1 AND status = $2
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(id)
        .bind(current.as_str())
        .bind(next.as_str())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Records a payment update. An approved payment also moves a confirmed
    /// order to paid. Returns false when no order matched.
    pub async fn update_payment(
        &self,
        order_id: Uuid,
        payment_status: PaymentStatus,
        payment_reference: &str,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_order_payment");
        let result = sqlx::query(
            r#"
            UPDATE pedidos
            SET payment_status = $2,
                payment_reference = $3,
                status = CASE WHEN $2 = 'approved' AND status = 'confirmed' THEN 'paid' ELSE status END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .bind(payment_status.as_str())
        .bind(payment_reference)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Order count and gross merchandise value of non-cancelled orders.
    pub async fn totals(&self) -> Result<(i64, i64), sqlx::Error> {
        let timer = QueryTimer::new("order_totals");
        let result = sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT COUNT(*),
                   COALESCE(SUM(total_cents) FILTER (WHERE status <> 'cancelled'), 0)::BIGINT
            FROM pedidos
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}
