//! patrimonio-db - Data access for the physical-asset inventory (patrimônio)
//!
//! The heart of this crate is a dynamic query builder for the item listing:
//! a fixed SELECT/JOIN template over `ITEM`, `TIPORECURSOFISICO` and
//! `ARMAZEM` to which caller-supplied filters are appended as parameterized
//! WHERE predicates. Filterable fields are a closed allowlist; values are
//! always bound, never interpolated into query text.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use patrimonio_db::{DatabaseManager, Filter, FilterField, ItemQuery};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let db = DatabaseManager::with_default_config().await?;
//! let query = ItemQuery::new()
//!     .filter(Filter::equals(FilterField::Status, "ATIVO"))
//!     .filter(Filter::contains(FilterField::AssetTag, "PAT-2024"));
//! let items = db.item_service().list_items(&query).await?;
//! # Ok(())
//! # }
//! ```

// Core error handling
pub mod error;

// Filter model and dynamic query assembly
pub mod query;

// Database integration
pub mod database;

pub use database::catalog_service::{CatalogDatabaseService, ResourceType, Warehouse};
pub use database::item_service::{
    ItemDatabaseService, ItemPatch, ItemRecord, NewItem, ResourceTypeRef, WarehouseRef,
};
pub use database::{DatabaseConfig, DatabaseManager};
pub use error::{FilterError, StoreError};
pub use query::{
    BuiltQuery, Filter, FilterField, FilterOp, FilterValue, ItemFilterParams, ItemQuery,
    BASE_ITEM_QUERY,
};
