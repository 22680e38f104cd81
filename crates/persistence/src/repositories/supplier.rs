//! Supplier and client profile repositories.

use domain::models::supplier::{SupplierFields, SupplierFilter};
use shared::pagination::PageParams;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::entities::profile::SUPPLIER_COLUMNS;
use crate::entities::{ClientEntity, SupplierEntity};
use crate::metrics::QueryTimer;

/// Column values for inserting or updating a supplier.
#[derive(Debug, Clone, Default)]
pub struct SupplierInput<'a> {
    pub user_id: Option<Uuid>,
    pub company_name: Option<&'a str>,
    pub trade_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub address: Option<&'a str>,
    pub city: Option<&'a str>,
    pub active: Option<bool>,
    pub fields: SupplierFields,
}

/// Repository for supplier (fornecedor) profiles and their catalog links.
#[derive(Clone)]
pub struct SupplierRepository {
    pool: PgPool,
}

impl SupplierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<SupplierEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_supplier_by_id");
        let result = sqlx::query_as::<_, SupplierEntity>(&format!(
            "SELECT {} FROM fornecedores f WHERE f.id = $1",
            SUPPLIER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_user_id(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SupplierEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_supplier_by_user_id");
        let result = sqlx::query_as::<_, SupplierEntity>(&format!(
            "SELECT {} FROM fornecedores f WHERE f.user_id = $1",
            SUPPLIER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lists suppliers matching the filter. Returns the page and the total count.
    pub async fn list(
        &self,
        filter: &SupplierFilter,
        page: &PageParams,
    ) -> Result<(Vec<SupplierEntity>, i64), sqlx::Error> {
        let timer = QueryTimer::new("list_suppliers");
        let search = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let uf = filter.uf.as_deref().map(|u| u.trim().to_uppercase());

        let where_clause = r#"
            WHERE ($1::text IS NULL OR f.company_name ILIKE $1 OR f.trade_name ILIKE $1 OR f.cnpj LIKE $1)
              AND ($2::uuid IS NULL OR EXISTS (
                    SELECT 1 FROM fornecedor_grupo fg WHERE fg.fornecedor_id = f.id AND fg.grupo_id = $2))
              AND ($3::text IS NULL OR f.uf = $3)
              AND ($4::bool IS NULL OR f.active = $4)
        "#;

        let rows = sqlx::query_as::<_, SupplierEntity>(&format!(
            "SELECT {} FROM fornecedores f {} ORDER BY f.company_name LIMIT $5 OFFSET $6",
            SUPPLIER_COLUMNS, where_clause
        ))
        .bind(search.as_deref())
        .bind(filter.grupo_id)
        .bind(uf.as_deref())
        .bind(filter.active)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(*) FROM fornecedores f {}",
            where_clause
        ))
        .bind(search.as_deref())
        .bind(filter.grupo_id)
        .bind(uf.as_deref())
        .bind(filter.active)
        .fetch_one(&self.pool)
        .await?;

        timer.record();
        Ok((rows, total))
    }

    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_suppliers");
        let result = sqlx::query_scalar("SELECT COUNT(*) FROM fornecedores")
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Creates a supplier and its grupo/material links in one transaction.
    pub async fn create(
        &self,
        input: &SupplierInput<'_>,
        grupo_ids: &[Uuid],
        material_ids: &[Uuid],
    ) -> Result<Uuid, sqlx::Error> {
        let timer = QueryTimer::new("create_supplier");
        let mut tx = self.pool.begin().await?;

        let id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO fornecedores
                (user_id, company_name, trade_name, cnpj, email, phone, address, city, uf, cep, active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, COALESCE($11, true))
            RETURNING id
            "#,
        )
        .bind(input.user_id)
        .bind(input.company_name.unwrap_or_default())
        .bind(input.trade_name)
        .bind(input.fields.cnpj.as_deref())
        .bind(input.email)
        .bind(input.phone)
        .bind(input.address)
        .bind(input.city)
        .bind(input.fields.uf.as_deref())
        .bind(input.fields.cep.as_deref())
        .bind(input.active)
        .fetch_one(&mut *tx)
        .await?;

        replace_links(&mut tx, id, Some(grupo_ids), Some(material_ids)).await?;

        tx.commit().await?;
        timer.record();
        Ok(id)
    }

    /// Partial update. `None` link lists leave the current links untouched.
    pub async fn update(
        &self,
        id: Uuid,
        input: &SupplierInput<'_>,
        grupo_ids: Option<&[Uuid]>,
        material_ids: Option<&[Uuid]>,
    ) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("update_supplier");
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE fornecedores
            SET company_name = COALESCE($2, company_name),
                trade_name = COALESCE($3, trade_name),
                cnpj = COALESCE($4, cnpj),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                address = COALESCE($7, address),
                city = COALESCE($8, city),
                uf = COALESCE($9, uf),
                cep = COALESCE($10, cep),
                active = COALESCE($11, active),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(input.company_name)
        .bind(input.trade_name)
        .bind(input.fields.cnpj.as_deref())
        .bind(input.email)
        .bind(input.phone)
        .bind(input.address)
        .bind(input.city)
        .bind(input.fields.uf.as_deref())
        .bind(input.fields.cep.as_deref())
        .bind(input.active)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            timer.record();
            return Ok(false);
        }

        replace_links(&mut tx, id, grupo_ids, material_ids).await?;

        tx.commit().await?;
        timer.record();
        Ok(true)
    }

    /// Number of orders that reference the supplier.
    pub async fn count_orders(&self, id: Uuid) -> Result<i64, sqlx::Error> {
        let timer = QueryTimer::new("count_supplier_orders");
        let result = sqlx::query_scalar("SELECT COUNT(*) FROM pedidos WHERE fornecedor_id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await;
        timer.record();
        result
    }

    /// Deletes the supplier and drops the `fornecedor` role from its account.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_supplier");
        let mut tx = self.pool.begin().await?;

        let user_id: Option<Option<Uuid>> =
            sqlx::query_scalar("DELETE FROM fornecedores WHERE id = $1 RETURNING user_id")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;

        let Some(user_id) = user_id else {
            tx.rollback().await?;
            timer.record();
            return Ok(false);
        };

        if let Some(user_id) = user_id {
            sqlx::query(
                r#"
                UPDATE users
                SET roles = array_remove(roles, 'fornecedor'),
                    role = CASE WHEN 'admin' = ANY(roles) THEN 'admin' ELSE 'cliente' END,
                    updated_at = NOW()
                WHERE id = $1
                "#,
            )
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        timer.record();
        Ok(true)
    }

    /// Whether the supplier serves any grupo or material of the quote.
    pub async fn serves_quote(&self, supplier_id: Uuid, quote_id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("supplier_serves_quote");
        let result = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM cotacoes c
                WHERE c.id = $2 AND (
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
            )
            "#,
        )
        .bind(supplier_id)
        .bind(quote_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

async fn replace_links(
    tx: &mut Transaction<'_, Postgres>,
    supplier_id: Uuid,
    grupo_ids: Option<&[Uuid]>,
    material_ids: Option<&[Uuid]>,
) -> Result<(), sqlx::Error> {
    if let Some(grupo_ids) = grupo_ids {
        sqlx::query("DELETE FROM fornecedor_grupo WHERE fornecedor_id = $1")
            .bind(supplier_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO fornecedor_grupo (fornecedor_id, grupo_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(supplier_id)
        .bind(grupo_ids)
        .execute(&mut **tx)
        .await?;
    }

    if let Some(material_ids) = material_ids {
        sqlx::query("DELETE FROM fornecedor_materiais WHERE fornecedor_id = $1")
            .bind(supplier_id)
            .execute(&mut **tx)
            .await?;
        sqlx::query(
            r#"
            INSERT INTO fornecedor_materiais (fornecedor_id, material_id)
            SELECT $1, UNNEST($2::uuid[])
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(supplier_id)
        .bind(material_ids)
        .execute(&mut **tx)
        .await?;
    }

    Ok(())
}

/// Repository for client (cliente) profiles.
#[derive(Clone)]
pub struct ClientRepository {
    pool: PgPool,
}

impl ClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_client_by_user_id");
        let result = sqlx::query_as::<_, ClientEntity>(
            r#"
            SELECT id, user_id, name, document, phone, city, uf, created_at, updated_at
            FROM clientes
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        name: Option<&str>,
        document: Option<&str>,
        phone: Option<&str>,
        city: Option<&str>,
        uf: Option<&str>,
    ) -> Result<Option<ClientEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_client");
        let result = sqlx::query_as::<_, ClientEntity>(
            r#"
            UPDATE clientes
            SET name = COALESCE($2, name),
                document = COALESCE($3, document),
                phone = COALESCE($4, phone),
                city = COALESCE($5, city),
                uf = COALESCE($6, uf),
                updated_at = NOW()
            WHERE user_id = $1
            RETURNING id, user_id, name, document, phone, city, uf, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(name)
        .bind(document)
        .bind(phone)
        .bind(city)
        .bind(uf)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
