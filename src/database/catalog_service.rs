//! Catalog Database Service - resource types and warehouses
//!
//! Lookup data for the item listing filters: the resource-type
//! classification table and the warehouse table.

use serde::Serialize;
use sqlx::{FromRow, PgPool};
use tracing::info;

use crate::error::StoreError;

/// A physical resource classification.
#[derive(Debug, Clone, Serialize, PartialEq, FromRow)]
pub struct ResourceType {
    #[sqlx(rename = "idtiporecurso")]
    pub id: String,
    #[sqlx(rename = "nome")]
    pub name: String,
}

/// A storage location.
#[derive(Debug, Clone, Serialize, PartialEq, FromRow)]
pub struct Warehouse {
    #[sqlx(rename = "idarmazem")]
    pub id: String,
    #[sqlx(rename = "endereco")]
    pub address: Option<String>,
}

/// Catalog database service for filter lookup data
pub struct CatalogDatabaseService {
    pool: PgPool,
}

impl CatalogDatabaseService {
    /// Create new catalog database service
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// List all resource types, ordered by name.
    pub async fn list_resource_types(&self) -> Result<Vec<ResourceType>, StoreError> {
        let types = sqlx::query_as::<_, ResourceType>(
            "SELECT IDTIPORECURSO, NOME FROM TIPORECURSOFISICO ORDER BY NOME",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(types)
    }

    /// Register a new resource type.
    pub async fn create_resource_type(
        &self,
        resource_type: ResourceType,
    ) -> Result<ResourceType, StoreError> {
        let existing = sqlx::query("SELECT 1 FROM TIPORECURSOFISICO WHERE IDTIPORECURSO = $1")
            .bind(&resource_type.id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(StoreError::already_exists("resource type", resource_type.id));
        }

        sqlx::query("INSERT INTO TIPORECURSOFISICO (IDTIPORECURSO, NOME) VALUES ($1, $2)")
            .bind(&resource_type.id)
            .bind(&resource_type.name)
            .execute(&self.pool)
            .await?;

        info!(
            "Created resource type '{}' ({})",
            resource_type.name, resource_type.id
        );
        Ok(resource_type)
    }

    /// Remove a resource type. Fails with [`StoreError::InUse`] when items
    /// still reference it.
    pub async fn delete_resource_type(&self, id: &str) -> Result<(), StoreError> {
        let existing = sqlx::query("SELECT 1 FROM TIPORECURSOFISICO WHERE IDTIPORECURSO = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_none() {
            return Err(StoreError::not_found("resource type", id));
        }

        sqlx::query("DELETE FROM TIPORECURSOFISICO WHERE IDTIPORECURSO = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_delete(e, "resource type", id))?;

        info!("Deleted resource type: {}", id);
        Ok(())
    }

    /// List all warehouses, ordered by id.
    pub async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        let warehouses = sqlx::query_as::<_, Warehouse>(
            "SELECT IDARMAZEM, ENDERECO FROM ARMAZEM ORDER BY IDARMAZEM",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(warehouses)
    }
}
