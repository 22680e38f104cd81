//! Catalog entities.

use chrono::{DateTime, Utc};
use domain::models::{Grupo, Material};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct GrupoEntity {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<GrupoEntity> for Grupo {
    fn from(e: GrupoEntity) -> Self {
        Self {
            id: e.id,
            name: e.name,
            description: e.description,
            active: e.active,
            created_at: e.created_at,
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct MaterialEntity {
    pub id: Uuid,
    pub grupo_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<MaterialEntity> for Material {
    fn from(e: MaterialEntity) -> Self {
        Self {
            id: e.id,
            grupo_id: e.grupo_id,
            name: e.name,
            description: e.description,
            unit: e.unit,
            active: e.active,
            created_at: e.created_at,
        }
    }
}
