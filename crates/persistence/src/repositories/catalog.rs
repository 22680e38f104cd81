//! Catalog repository: grupos and materiais.

use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{GrupoEntity, MaterialEntity};
use crate::metrics::QueryTimer;

const GRUPO_COLUMNS: &str = "id, name, description, active, created_at";
const MATERIAL_COLUMNS: &str = "id, grupo_id, name, description, unit, active, created_at";

#[derive(Clone)]
pub struct CatalogRepository {
    pool: PgPool,
}

impl CatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Lists grupos; inactive ones only when `include_inactive`.
    pub async fn list_grupos(&self, include_inactive: bool) -> Result<Vec<GrupoEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_grupos");
        let result = sqlx::query_as::<_, GrupoEntity>(&format!(
            "SELECT {} FROM grupos WHERE active OR $1 ORDER BY name",
            GRUPO_COLUMNS
        ))
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create_grupo(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<GrupoEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_grupo");
        let result = sqlx::query_as::<_, GrupoEntity>(&format!(
            "INSERT INTO grupos (name, description) VALUES ($1, $2) RETURNING {}",
            GRUPO_COLUMNS
        ))
        .bind(name)
        .bind(description)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update_grupo(
        &self,
        id: Uuid,
        name: Option<&str>,
        description: Option<&str>,
        active: Option<bool>,
    ) -> Result<Option<GrupoEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_grupo");
        let result = sqlx::query_as::<_, GrupoEntity>(&format!(
            r#"
            UPDATE grupos
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                active = COALESCE($4, active)
            WHERE id = $1
            RETURNING {}
            "#,
            GRUPO_COLUMNS
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Fails with a foreign key violation while materials still reference it.
    pub async fn delete_grupo(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_grupo");
        let result = sqlx::query("DELETE FROM grupos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }

    pub async fn list_materiais(
        &self,
        grupo_id: Option<Uuid>,
        search: Option<&str>,
        include_inactive: bool,
    ) -> Result<Vec<MaterialEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_materiais");
        let search = search
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| format!("%{}%", s));
        let result = sqlx::query_as::<_, MaterialEntity>(&format!(
            r#"
            SELECT {} FROM materiais
            WHERE ($1::uuid IS NULL OR grupo_id = $1)
              AND ($2::text IS NULL OR name ILIKE $2)
              AND (active OR $3)
            ORDER BY name
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(grupo_id)
        .bind(search.as_deref())
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn create_material(
        &self,
        grupo_id: Uuid,
        name: &str,
        description: Option<&str>,
        unit: &str,
    ) -> Result<MaterialEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_material");
        let result = sqlx::query_as::<_, MaterialEntity>(&format!(
            r#"
            INSERT INTO materiais (grupo_id, name, description, unit)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(grupo_id)
        .bind(name)
        .bind(description)
        .bind(unit)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update_material(
        &self,
        id: Uuid,
        grupo_id: Option<Uuid>,
        name: Option<&str>,
        description: Option<&str>,
        unit: Option<&str>,
        active: Option<bool>,
    ) -> Result<Option<MaterialEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_material");
        let result = sqlx::query_as::<_, MaterialEntity>(&format!(
            r#"
            UPDATE materiais
            SET grupo_id = COALESCE($2, grupo_id),
                name = COALESCE($3, name),
                description = COALESCE($4, description),
                unit = COALESCE($5, unit),
                active = COALESCE($6, active)
            WHERE id = $1
            RETURNING {}
            "#,
            MATERIAL_COLUMNS
        ))
        .bind(id)
        .bind(grupo_id)
        .bind(name)
        .bind(description)
        .bind(unit)
        .bind(active)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_material(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_material");
        let result = sqlx::query("DELETE FROM materiais WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        timer.record();
        Ok(result.rows_affected() > 0)
    }
}
