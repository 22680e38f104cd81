//! Quote repository.

use std::collections::HashMap;

use chrono::NaiveDate;
use domain::models::quote::CreateQuoteRequest;
use domain::models::{Quote, QuoteStatus};
use shared::pagination::PageParams;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::quote::QUOTE_COLUMNS;
use crate::entities::{QuoteEntity, QuoteItemEntity};
use crate::metrics::QueryTimer;

/// Visible quotes for a supplier: open or responded and within its grupos or materials.
const SUPPLIER_SCOPE: &str = r#"
    c.status IN ('open', 'responded')
    AND (
        EXISTS (SELECT 1 FROM fornecedor_grupo fg
                WHERE fg.fornecedor_id = $1 AND fg.grupo_id = c.grupo_id)
        OR EXISTS (SELECT 1 FROM cotacao_itens i
                   JOIN fornecedor_materiais fm ON fm.material_id = i.material_id
                   WHERE i.cotacao_id = c.id AND fm.fornecedor_id = $1)
        OR EXISTS (SELECT 1 FROM cotacao_itens i
                   JOIN materiais m ON m.id = i.material_id
                   JOIN fornecedor_grupo fg ON fg.grupo_id = m.grupo_id
                   WHERE i.cotacao_id = c.id AND fg.fornecedor_id = $1)
    )
"#;

#[derive(Clone)]
pub struct QuoteRepository {
    pool: PgPool,
}

impl QuoteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the quote and its items in one transaction.
    pub async fn create(
        &self,
        client_user_id: Uuid,
        request: &CreateQuoteRequest,
    ) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("create_quote");
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO cotacoes
                (client_user_id, grupo_id, title, description, delivery_city, delivery_uf, deadline)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(client_user_id)
        .bind(request.grupo_id)
        .bind(&request.title)
        .bind(request.description.as_deref())
        .bind(request.delivery_city.as_deref())
        .bind(request.delivery_uf.as_deref().map(str::to_uppercase))
        .bind(request.deadline)
        .fetch_one(&mut *tx)
        .await?;

        for (position, item) in request.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO cotacao_itens (cotacao_id, material_id, description, quantity, unit, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(id)
            .bind(item.material_id)
            .bind(&item.description)
            .bind(item.quantity)
            .bind(&item.unit)
            .bind(position as i32)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(id)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Quote>, sqlx::Error> {
        let timer = QueryTimer::new("find_quote_by_id");
        let entity = sqlx::query_as::<_, QuoteEntity>(&format!(
            "SELECT {} FROM cotacoes c WHERE c.id = $1",
            QUOTE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        timer.record();

        match entity {
            Some(entity) => {
                let mut items = self.items_for(&[entity.id]).await?;
                let quote_items = items.remove(&entity.id).unwrap_or_default();
                Ok(Some(entity.into_quote(quote_items)))
            }
            None => Ok(None),
        }
    }

    /// Quotes requested by one client.
    pub async fn list_for_client(
        &self,
        client_user_id: Uuid,
        status: Option<QuoteStatus>,
        page: &PageParams,
    ) -> Result<(Vec<Quote>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_client_quotes");
        let where_clause = "WHERE c.client_user_id = $1 AND ($2::text IS NULL OR c.status = $2)";
        let status = status.map(|s| s.as_str());

        let rows = sqlx::query_as::<_, QuoteEntity>(&format!(
            "SELECT {} FROM cotacoes c {} ORDER BY c.created_at DESC LIMIT $3 OFFSET $4",
            QUOTE_COLUMNS, where_clause
        ))
        .bind(client_user_id)
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM cotacoes c {}",
            where_clause
        ))
        .bind(client_user_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        Ok((self.with_items(rows).await?, total))
    }

    /// Open quotes a supplier may respond to.
    pub async fn list_open_for_supplier(
        &self,
        supplier_id: Uuid,
        page: &PageParams,
    ) -> Result<(Vec<Quote>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_supplier_quotes");
        let rows = sqlx::query_as::<_, QuoteEntity>(&format!(
            "SELECT {} FROM cotacoes c WHERE {} ORDER BY c.created_at DESC LIMIT $2 OFFSET $3",
            QUOTE_COLUMNS, SUPPLIER_SCOPE
        ))
        .bind(supplier_id)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM cotacoes c WHERE {}",
            SUPPLIER_SCOPE
        ))
        .bind(supplier_id)
        .fetch_one(&self.pool)
        .await?;
        timer.record();

        Ok((self.with_items(rows).await?, total))
    }

    /// Every quote, for admins.
    pub async fn list_all(
        &self,
        status: Option<QuoteStatus>,
        page: &PageParams,
    ) -> Result<(Vec<Quote>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_all_quotes");
        let status = status.map(|s| s.as_str());
        let rows = sqlx::query_as::<_, QuoteEntity>(&format!(
            r#"
            SELECT {} FROM cotacoes c
            WHERE ($1::text IS NULL OR c.status = $1)
            ORDER BY c.created_at DESC LIMIT $2 OFFSET $3
            "#,
            QUOTE_COLUMNS
        ))
        .bind(status)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM cotacoes WHERE ($1::text IS NULL OR status = $1)")
                .bind(status)
                .fetch_one(&self.pool)
                .await?;
        timer.record();

        Ok((self.with_items(rows).await?, total))
    }

    /// Cancels an open or responded quote. Returns false if it was not cancellable.
    pub async fn cancel(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("cancel_quote");
        let result = sqlx::query(
            r#"
            UPDATE cotacoes SET status = 'cancelled', updated_at = NOW()
            WHERE id = $1 AND status IN ('open', 'responded')
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    /// Marks open quotes whose deadline is before `today` as expired.
    pub async fn expire_past_deadline(&self, today: NaiveDate) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("expire_quotes");
        let result = sqlx::query(
            r#"
            UPDATE cotacoes SET status = 'expired', updated_at = NOW()
            WHERE status IN ('open', 'responded') AND deadline IS NOT NULL AND deadline < $1
            "#,
        )
        .bind(today)
        .execute(&self.pool)
        .await?;
        timer.record();
        Ok(result.rows_affected())
    }

    pub async fn count_by_status(&self) -> Result<Vec<(String, i64)>, sqlx::Error> {
        let timer = QueryTimer::new("count_quotes_by_status");
        let result =
            sqlx::query_as::<_, (String, i64)>("SELECT status, COUNT(*) FROM cotacoes GROUP BY status")
                .fetch_all(&self.pool)
                .await;
        timer.record();
        result
    }

    async fn with_items(&self, rows: Vec<QuoteEntity>) -> Result<Vec<Quote>, sqlx::Error> {
        let ids: Vec<Uuid> = rows.iter().map(|q| q.id).collect();
        let mut items = self.items_for(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|q| {
                let quote_items = items.remove(&q.id).unwrap_or_default();
                q.into_quote(quote_items)
            })
            .collect())
    }

    async fn items_for(
        &self,
        quote_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<QuoteItemEntity>>, sqlx::Error> {
        if quote_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let timer = QueryTimer::new("list_quote_items");
        let rows = sqlx::query_as::<_, QuoteItemEntity>(
            r#"
            SELECT id, cotacao_id, material_id, description, quantity, unit
            FROM cotacao_itens
            WHERE cotacao_id = ANY($1)
            ORDER BY position
            "#,
        )
        .bind(quote_ids)
        .fetch_all(&self.pool)
        .await?;
        timer.record();

        let mut grouped: HashMap<Uuid, Vec<QuoteItemEntity>> = HashMap::new();
        for row in rows {
            grouped.entry(row.cotacao_id).or_default().push(row);
        }
        Ok(grouped)
    }
}
