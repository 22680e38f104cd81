//! Proposal repository.

use domain::models::proposal::CreateProposalRequest;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::quote::{ORDER_COLUMNS, PROPOSAL_COLUMNS};
use crate::entities::{OrderEntity, ProposalEntity};
use crate::metrics::QueryTimer;

/// Result of [`ProposalRepository::accept`].
#[derive(Debug)]
pub enum AcceptOutcome {
    Accepted(OrderEntity),
    NotFound,
    ProposalNotPending,
    QuoteNotOpen,
}

#[derive(Clone)]
pub struct ProposalRepository {
    pool: PgPool,
}

impl ProposalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a proposal and marks an open quote as responded.
    ///
    /// A second proposal from the same supplier violates the
    /// `(cotacao_id, fornecedor_id)` unique constraint.
    pub async fn create(
        &self,
        quote_id: Uuid,
        supplier_id: Uuid,
        request: &CreateProposalRequest,
    ) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("create_proposal");
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO propostas (cotacao_id, fornecedor_id, total_cents, delivery_days, valid_until, notes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(quote_id)
        .bind(supplier_id)
        .bind(request.total_cents)
        .bind(request.delivery_days)
        .bind(request.valid_until)
        .bind(request.notes.as_deref())
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE cotacoes SET status = 'responded', updated_at = NOW() WHERE id = $1 AND status = 'open'",
        )
        .bind(quote_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(id)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ProposalEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_proposal_by_id");
        let result = sqlx::query_as::<_, ProposalEntity>(&format!(
            "SELECT {} FROM propostas p JOIN fornecedores f ON f.id = p.fornecedor_id WHERE p.id = $1",
            PROPOSAL_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Proposals on a quote, optionally restricted to one supplier.
    pub async fn list_for_quote(
        &self,
        quote_id: Uuid,
        supplier_id: Option<Uuid>,
    ) -> Result<Vec<ProposalEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_quote_proposals");
        let result = sqlx::query_as::<_, ProposalEntity>(&format!(
            r#"
            SELECT {} FROM propostas p
            JOIN fornecedores f ON f.id = p.fornecedor_id
            WHERE p.cotacao_id = $1 AND ($2::uuid IS NULL OR p.fornecedor_id = $2)
            ORDER BY p.total_cents, p.created_at
            "#,
            PROPOSAL_COLUMNS
        ))
        .bind(quote_id)
        .bind(supplier_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Accepts a proposal: the proposal becomes accepted, its siblings are
    /// rejected, the quote is closed and an order is created, atomically.
    pub async fn accept(&self, proposal_id: Uuid) -> Result<AcceptOutcome, sqlx::Error> {
        let timer = QueryTimer::new("accept_proposal");
        let mut tx = self.pool.begin().await?;

        let row: Option<(Uuid, Uuid, i64, String, String, Uuid)> = sqlx::query_as(
            r#"
            SELECT p.cotacao_id, p.fornecedor_id, p.total_cents, p.status, c.status, c.client_user_id
            FROM propostas p
            JOIN cotacoes c ON c.id = p.cotacao_id
            WHERE p.id = $1
            FOR UPDATE OF p, c
            "#,
        )
        .bind(proposal_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some((quote_id, supplier_id, total_cents, proposal_status, quote_status, client_user_id)) =
            row
        else {
            tx.rollback().await?;
            timer.record();
            return Ok(AcceptOutcome::NotFound);
        };

        if proposal_status != "pending" {
            tx.rollback().await?;
            timer.record();
            return Ok(AcceptOutcome::ProposalNotPending);
        }
        if quote_status != "open" && quote_status != "responded" {
            tx.rollback().await?;
            timer.record();
            return Ok(AcceptOutcome::QuoteNotOpen);
        }

        sqlx::query("UPDATE propostas SET status = 'accepted', updated_at = NOW() WHERE id = $1")
            .bind(proposal_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE propostas SET status = 'rejected', updated_at = NOW()
            WHERE cotacao_id = $1 AND id <> $2 AND status = 'pending'
            "#,
        )
        .bind(quote_id)
        .bind(proposal_id)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE cotacoes SET status = 'closed', updated_at = NOW() WHERE id = $1")
            .bind(quote_id)
            .execute(&mut *tx)
            .await?;

        let order = sqlx::query_as::<_, OrderEntity>(&format!(
            r#"
            INSERT INTO pedidos (cotacao_id, proposta_id, client_user_id, fornecedor_id, total_cents)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {}
            "#,
            ORDER_COLUMNS
        ))
        .bind(quote_id)
        .bind(proposal_id)
        .bind(client_user_id)
        .bind(supplier_id)
        .bind(total_cents)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();
        Ok(AcceptOutcome::Accepted(order))
    }
}
