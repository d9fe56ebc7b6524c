//! Item Database Service - patrimônio item operations
//!
//! Executes the dynamically built item listing and provides the item
//! lifecycle operations (create, partial update, delete) with the same
//! referential checks the application has always enforced: the resource type
//! must exist, the warehouse (when given) must exist, and the asset tag is
//! unique.

use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::{debug, info};

use crate::error::StoreError;
use crate::query::{Filter, FilterField, FilterValue, ItemQuery};

/// Default status for newly registered items.
pub const DEFAULT_ITEM_STATUS: &str = "Disponível";

/// One row of the item listing: the item with its resource-type
/// classification and, when assigned, its warehouse.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ItemRecord {
    pub asset_tag: String,
    pub status: String,
    pub quality: Option<String>,
    pub size: f64,
    pub resource_type: ResourceTypeRef,
    pub warehouse: Option<WarehouseRef>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResourceTypeRef {
    pub name: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WarehouseRef {
    pub id: String,
    pub address: Option<String>,
}

/// A new item to register.
#[derive(Debug, Clone)]
pub struct NewItem {
    pub asset_tag: String,
    /// Defaults to [`DEFAULT_ITEM_STATUS`] when `None`.
    pub status: Option<String>,
    pub quality: Option<String>,
    pub size: f64,
    pub resource_type_id: String,
    pub warehouse_id: Option<String>,
}

/// Partial update: `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct ItemPatch {
    pub status: Option<String>,
    pub quality: Option<String>,
    pub size: Option<f64>,
    pub resource_type_id: Option<String>,
    pub warehouse_id: Option<String>,
}

/// Item database service for patrimônio operations
pub struct ItemDatabaseService {
    pool: PgPool,
}

impl ItemDatabaseService {
    /// Create new item database service
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==========================================
    // LISTING AND LOOKUP
    // ==========================================

    /// Run the item listing with the given filter set.
    pub async fn list_items(&self, query: &ItemQuery) -> Result<Vec<ItemRecord>, StoreError> {
        let built = query.build();
        debug!(
            filters = query.filters().len(),
            "Executing item listing query"
        );

        let mut q = sqlx::query(&built.sql);
        for value in &built.params {
            q = match value {
                FilterValue::Text(s) => q.bind(s.as_str()),
                FilterValue::Number(n) => q.bind(*n),
            };
        }

        let rows = q.fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(map_item_row)
            .collect::<Result<Vec<_>, _>>()?;

        debug!(count = items.len(), "Item listing complete");
        Ok(items)
    }

    /// Fetch a single item by asset tag, with its classification and
    /// warehouse.
    pub async fn get_item(&self, asset_tag: &str) -> Result<Option<ItemRecord>, StoreError> {
        let query =
            ItemQuery::new().filter(Filter::equals(FilterField::AssetTag, asset_tag));
        Ok(self.list_items(&query).await?.into_iter().next())
    }

    // ==========================================
    // LIFECYCLE
    // ==========================================

    /// Register a new item.
    ///
    /// Validates the resource-type and warehouse references and the
    /// uniqueness of the asset tag before inserting.
    pub async fn create_item(&self, item: NewItem) -> Result<ItemRecord, StoreError> {
        if !self.resource_type_exists(&item.resource_type_id).await? {
            return Err(StoreError::not_found(
                "resource type",
                item.resource_type_id,
            ));
        }

        if let Some(warehouse_id) = &item.warehouse_id {
            if !self.warehouse_exists(warehouse_id).await? {
                return Err(StoreError::not_found("warehouse", warehouse_id.clone()));
            }
        }

        if self.item_exists(&item.asset_tag).await? {
            return Err(StoreError::already_exists("item", item.asset_tag));
        }

        sqlx::query(
            r#"
            INSERT INTO ITEM (NROPATRIMONIO, STATUSITEM, QUALIDADE, TAMANHO, IDTIPORECURSO, IDARMAZEM)
            VALUES ($1, COALESCE($2, $3), $4, $5, $6, $7)
            "#,
        )
        .bind(&item.asset_tag)
        .bind(&item.status)
        .bind(DEFAULT_ITEM_STATUS)
        .bind(&item.quality)
        .bind(item.size)
        .bind(&item.resource_type_id)
        .bind(&item.warehouse_id)
        .execute(&self.pool)
        .await?;

        info!("Registered item: {}", item.asset_tag);

        // Read back through the listing so the caller gets the joined record.
        let record = self.get_item(&item.asset_tag).await?;
        record.ok_or_else(|| StoreError::not_found("item", item.asset_tag))
    }

    /// Apply a partial update to an item. Fields left `None` are unchanged.
    pub async fn update_item(
        &self,
        asset_tag: &str,
        patch: ItemPatch,
    ) -> Result<ItemRecord, StoreError> {
        if !self.item_exists(asset_tag).await? {
            return Err(StoreError::not_found("item", asset_tag));
        }

        if let Some(resource_type_id) = &patch.resource_type_id {
            if !self.resource_type_exists(resource_type_id).await? {
                return Err(StoreError::not_found(
                    "resource type",
                    resource_type_id.clone(),
                ));
            }
        }

        if let Some(warehouse_id) = &patch.warehouse_id {
            if !self.warehouse_exists(warehouse_id).await? {
                return Err(StoreError::not_found("warehouse", warehouse_id.clone()));
            }
        }

        sqlx::query(
            r#"
            UPDATE ITEM
            SET STATUSITEM = COALESCE($1, STATUSITEM),
                QUALIDADE = COALESCE($2, QUALIDADE),
                TAMANHO = COALESCE($3, TAMANHO),
                IDTIPORECURSO = COALESCE($4, IDTIPORECURSO),
                IDARMAZEM = COALESCE($5, IDARMAZEM)
            WHERE NROPATRIMONIO = $6
            "#,
        )
        .bind(&patch.status)
        .bind(&patch.quality)
        .bind(patch.size)
        .bind(&patch.resource_type_id)
        .bind(&patch.warehouse_id)
        .bind(asset_tag)
        .execute(&self.pool)
        .await?;

        info!("Updated item: {}", asset_tag);

        let record = self.get_item(asset_tag).await?;
        record.ok_or_else(|| StoreError::not_found("item", asset_tag))
    }

    /// Remove an item. Fails with [`StoreError::InUse`] when the item is
    /// still referenced (allocations).
    pub async fn delete_item(&self, asset_tag: &str) -> Result<(), StoreError> {
        if !self.item_exists(asset_tag).await? {
            return Err(StoreError::not_found("item", asset_tag));
        }

        sqlx::query("DELETE FROM ITEM WHERE NROPATRIMONIO = $1")
            .bind(asset_tag)
            .execute(&self.pool)
            .await
            .map_err(|e| StoreError::from_delete(e, "item", asset_tag))?;

        info!("Deleted item: {}", asset_tag);
        Ok(())
    }

    // ==========================================
    // EXISTENCE CHECKS
    // ==========================================

    async fn item_exists(&self, asset_tag: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM ITEM WHERE NROPATRIMONIO = $1")
            .bind(asset_tag)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn resource_type_exists(&self, id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM TIPORECURSOFISICO WHERE IDTIPORECURSO = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn warehouse_exists(&self, id: &str) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM ARMAZEM WHERE IDARMAZEM = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }
}

/// Maps one listing row, by projection position. The warehouse columns come
/// from the LEFT JOIN: a null id means the item has no warehouse.
fn map_item_row(row: &PgRow) -> Result<ItemRecord, sqlx::Error> {
    let warehouse = match row.try_get::<Option<String>, _>(5)? {
        Some(id) => Some(WarehouseRef {
            id,
            address: row.try_get(6)?,
        }),
        None => None,
    };

    Ok(ItemRecord {
        asset_tag: row.try_get(0)?,
        status: row.try_get(1)?,
        quality: row.try_get(2)?,
        size: row.try_get(3)?,
        resource_type: ResourceTypeRef {
            name: row.try_get(4)?,
        },
        warehouse,
    })
}
