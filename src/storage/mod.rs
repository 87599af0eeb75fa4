// Storage abstraction for the Postgres and local fallback backends

pub mod kv;
pub mod local;
pub mod postgres;

pub use kv::{FileKv, KeyValueStore, MemoryKv};
pub use local::LocalStore;
pub use postgres::PgStore;

use std::sync::Arc;

use crate::config::{Config, StorageBackendKind};
use crate::db::{create_pool, ensure_schema};
use crate::error::AppResult;
use crate::models::{Item, ItemStatus, ItemType, UserRecord};

/// Criteria for listing items. Results are always ordered by `created_at`
/// descending.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemFilter {
    pub item_type: Option<ItemType>,
    pub user_id: Option<String>,
}

impl ItemFilter {
    pub fn of_type(item_type: ItemType) -> Self {
        Self {
            item_type: Some(item_type),
            ..Self::default()
        }
    }

    pub fn owned_by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn matches(&self, item: &Item) -> bool {
        self.item_type.map_or(true, |t| item.item_type == t)
            && self.user_id.as_deref().map_or(true, |u| item.user_id == u)
    }
}

/// Backend-neutral persistence interface (Postgres / local fallback).
///
/// Emails passed in are already normalized by the caller. Mutating item
/// operations take the owner id and only touch rows that owner holds.
#[tonic::async_trait]
pub trait Store: Send + Sync {
    /// Short name for logs.
    fn backend_name(&self) -> &'static str;

    /// Cheap round trip proving the backend is reachable.
    async fn ping(&self) -> AppResult<()>;

    /// Fails with `Conflict` when the email is taken.
    async fn insert_user(&self, user: &UserRecord) -> AppResult<()>;

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<UserRecord>>;

    async fn insert_item(&self, item: &Item) -> AppResult<()>;

    async fn find_item(&self, id: &str) -> AppResult<Option<Item>>;

    async fn find_items(&self, filter: &ItemFilter) -> AppResult<Vec<Item>>;

    /// Returns the updated item, or `None` when no item with this id is held
    /// by `owner_id`.
    async fn update_item_status(
        &self,
        id: &str,
        owner_id: &str,
        status: ItemStatus,
    ) -> AppResult<Option<Item>>;

    /// Returns whether an item with this id held by `owner_id` was removed.
    async fn delete_item(&self, id: &str, owner_id: &str) -> AppResult<bool>;
}

/// Opens the backend selected by configuration. Called once by the
/// composition root; the handle is shared from there.
pub async fn connect(config: &Config) -> AppResult<Arc<dyn Store>> {
    match config.storage_backend {
        StorageBackendKind::Postgres => {
            tracing::info!("Connecting to database...");
            let pool = create_pool(&config.database_url, config.database_max_connections).await?;
            ensure_schema(&pool).await?;
            tracing::info!("Database connection established");
            Ok(Arc::new(PgStore::new(pool)))
        }
        StorageBackendKind::Local => {
            let kv: Arc<dyn KeyValueStore> = match &config.local_store_dir {
                Some(dir) => {
                    tracing::info!("Local fallback store enabled: dir={}", dir.display());
                    Arc::new(FileKv::open(dir)?)
                }
                None => {
                    tracing::info!("Local fallback store enabled: in memory");
                    Arc::new(MemoryKv::new())
                }
            };
            Ok(Arc::new(LocalStore::new(kv)?))
        }
    }
}
