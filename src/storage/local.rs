use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::Mutex;

use crate::error::{AppError, AppResult};
use crate::models::{Item, ItemStatus, ItemType, UserRecord};

use super::{ItemFilter, KeyValueStore, MemoryKv, Store};

pub const USERS_KEY: &str = "users";
pub const LOST_ITEMS_KEY: &str = "lostItems";
pub const FOUND_ITEMS_KEY: &str = "foundItems";

const KEYS: [&str; 3] = [USERS_KEY, LOST_ITEMS_KEY, FOUND_ITEMS_KEY];

/// Fallback store for local development. Each key holds a JSON array of
/// records; lost and found items live under separate keys.
///
/// Key-value access is blocking (`FileKv` touches the filesystem), so every
/// operation runs on the blocking thread pool.
pub struct LocalStore {
    kv: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write sequences on the same process
    write_lock: Mutex<()>,
}

impl LocalStore {
    /// Seeds missing keys with `[]` and rejects corrupt ones.
    pub fn new(kv: Arc<dyn KeyValueStore>) -> AppResult<Self> {
        for key in KEYS {
            if kv.get(key)?.is_none() {
                kv.set(key, "[]")?;
            }
            load::<serde_json::Value>(kv.as_ref(), key)?;
        }
        Ok(Self {
            kv,
            write_lock: Mutex::new(()),
        })
    }

    pub fn in_memory() -> Self {
        Self {
            kv: Arc::new(MemoryKv::with_entries(KEYS.map(|key| (key, "[]")))),
            write_lock: Mutex::new(()),
        }
    }

    async fn run<T, F>(&self, op: F) -> AppResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KeyValueStore) -> AppResult<T> + Send + 'static,
    {
        let kv = self.kv.clone();
        tokio::task::spawn_blocking(move || op(kv.as_ref()))
            .await
            .map_err(|e| AppError::Internal(format!("Local store task failed: {}", e)))?
    }
}

fn items_key(item_type: ItemType) -> &'static str {
    match item_type {
        ItemType::Lost => LOST_ITEMS_KEY,
        ItemType::Found => FOUND_ITEMS_KEY,
    }
}

/// Reads the array under `key`. An absent key reads as empty; only
/// `LocalStore::new` and writers holding the lock create keys.
fn load<T: DeserializeOwned>(kv: &dyn KeyValueStore, key: &str) -> AppResult<Vec<T>> {
    match kv.get(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map_err(|e| AppError::Storage(format!("Corrupt local store key '{}': {}", key, e))),
        None => Ok(Vec::new()),
    }
}

fn save<T: Serialize>(kv: &dyn KeyValueStore, key: &str, records: &[T]) -> AppResult<()> {
    let raw = serde_json::to_string(records)?;
    kv.set(key, &raw)
}

fn sort_newest_first(items: &mut [Item]) {
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

#[tonic::async_trait]
impl Store for LocalStore {
    fn backend_name(&self) -> &'static str {
        "local"
    }

    async fn ping(&self) -> AppResult<()> {
        self.run(|kv| kv.get(USERS_KEY).map(|_| ())).await
    }

    async fn insert_user(&self, user: &UserRecord) -> AppResult<()> {
        let user = user.clone();
        let _guard = self.write_lock.lock().await;
        self.run(move |kv| {
            let mut users: Vec<UserRecord> = load(kv, USERS_KEY)?;
            if users.iter().any(|u| u.email.to_lowercase() == user.email.to_lowercase()) {
                return Err(AppError::Conflict("Email already registered".to_string()));
            }
            users.push(user);
            save(kv, USERS_KEY, &users)
        })
        .await
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let email = email.to_lowercase();
        self.run(move |kv| {
            let users: Vec<UserRecord> = load(kv, USERS_KEY)?;
            Ok(users.into_iter().find(|u| u.email.to_lowercase() == email))
        })
        .await
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        let id = id.to_string();
        self.run(move |kv| {
            let users: Vec<UserRecord> = load(kv, USERS_KEY)?;
            Ok(users.into_iter().find(|u| u.id == id))
        })
        .await
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        let item = item.clone();
        let _guard = self.write_lock.lock().await;
        self.run(move |kv| {
            let key = items_key(item.item_type);
            let mut items: Vec<Item> = load(kv, key)?;
            items.insert(0, item);
            save(kv, key, &items)
        })
        .await
    }

    async fn find_item(&self, id: &str) -> AppResult<Option<Item>> {
        let id = id.to_string();
        self.run(move |kv| {
            for key in [LOST_ITEMS_KEY, FOUND_ITEMS_KEY] {
                let items: Vec<Item> = load(kv, key)?;
                if let Some(item) = items.into_iter().find(|i| i.id == id) {
                    return Ok(Some(item));
                }
            }
            Ok(None)
        })
        .await
    }

    async fn find_items(&self, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        let filter = filter.clone();
        self.run(move |kv| {
            let types = match filter.item_type {
                Some(t) => vec![t],
                None => vec![ItemType::Lost, ItemType::Found],
            };

            let mut result = Vec::new();
            for item_type in types {
                let items: Vec<Item> = load(kv, items_key(item_type))?;
                result.extend(items.into_iter().filter(|i| filter.matches(i)));
            }
            sort_newest_first(&mut result);
            Ok(result)
        })
        .await
    }

    async fn update_item_status(
        &self,
        id: &str,
        owner_id: &str,
        status: ItemStatus,
    ) -> AppResult<Option<Item>> {
        let (id, owner_id) = (id.to_string(), owner_id.to_string());
        let _guard = self.write_lock.lock().await;
        self.run(move |kv| {
            for key in [LOST_ITEMS_KEY, FOUND_ITEMS_KEY] {
                let mut items: Vec<Item> = load(kv, key)?;
                if let Some(item) = items.iter_mut().find(|i| i.id == id) {
                    if !item.is_owned_by(&owner_id) {
                        return Ok(None);
                    }
                    item.status = status;
                    let updated = item.clone();
                    save(kv, key, &items)?;
                    return Ok(Some(updated));
                }
            }
            Ok(None)
        })
        .await
    }

    async fn delete_item(&self, id: &str, owner_id: &str) -> AppResult<bool> {
        let (id, owner_id) = (id.to_string(), owner_id.to_string());
        let _guard = self.write_lock.lock().await;
        self.run(move |kv| {
            for key in [LOST_ITEMS_KEY, FOUND_ITEMS_KEY] {
                let mut items: Vec<Item> = load(kv, key)?;
                if let Some(pos) = items.iter().position(|i| i.id == id) {
                    if !items[pos].is_owned_by(&owner_id) {
                        return Ok(false);
                    }
                    items.remove(pos);
                    save(kv, key, &items)?;
                    return Ok(true);
                }
            }
            Ok(false)
        })
        .await
    }
}
