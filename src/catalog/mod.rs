//! Data access layer over the active [`Store`].
//!
//! Normalizes what the backends hand back: identifiers are UUID v4 strings,
//! timestamps are UTC, emails are lowercased, and images are turned into
//! `data:` URLs. Read operations report backend failures as
//! [`AppError::Unavailable`] so an empty listing is never confused with an
//! outage; write failures propagate unchanged.

pub mod image;
pub mod matching;

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::models::{normalize_email, Item, ItemStatus, ItemType, NewItem, User, UserRecord};
use crate::storage::{ItemFilter, Store};

#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn Store>,
}

impl Catalog {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    fn degrade(&self, operation: &str, err: AppError) -> AppError {
        if err.is_backend_failure() {
            tracing::warn!(
                "Read failed: op={}, backend={}, error={}",
                operation,
                self.store.backend_name(),
                err
            );
        }
        err.into_unavailable()
    }

    /// Creates an account. Callers check for an existing email first; the
    /// store still rejects duplicates with `Conflict`.
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> AppResult<UserRecord> {
        let record = UserRecord {
            id: Uuid::new_v4().to_string(),
            email: normalize_email(email),
            name: name.trim().to_string(),
            password_hash: hash_password(password)?,
        };
        self.store.insert_user(&record).await?;
        tracing::info!("User created: id={}, email={}", record.id, record.email);
        Ok(record)
    }

    pub async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        self.store
            .find_user_by_email(&normalize_email(email))
            .await
            .map_err(|e| self.degrade("find_user_by_email", e))
    }

    pub async fn find_user_by_id(&self, id: &str) -> AppResult<Option<User>> {
        self.store
            .find_user_by_id(id)
            .await
            .map(|u| u.map(User::from))
            .map_err(|e| self.degrade("find_user_by_id", e))
    }

    pub async fn create_item(
        &self,
        form: NewItem,
        item_type: ItemType,
        owner: &User,
    ) -> AppResult<Item> {
        let required = [
            ("name", &form.name),
            ("category", &form.category),
            ("location", &form.location),
            ("date", &form.date),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(AppError::InvalidInput(format!("{} is required", field)));
        }

        let image_url = image::image_url_for(form.image.as_ref())?;
        let item = Item {
            id: Uuid::new_v4().to_string(),
            name: form.name.trim().to_string(),
            category: form.category.trim().to_string(),
            location: form.location.trim().to_string(),
            date: form.date.trim().to_string(),
            description: form.description.trim().to_string(),
            image_url,
            user_id: owner.id.clone(),
            user_name: owner.name.clone(),
            contact_info: form.contact_info.trim().to_string(),
            created_at: Utc::now(),
            item_type,
            status: ItemStatus::Searching,
        };

        self.store.insert_item(&item).await?;
        tracing::info!(
            "Item created: id={}, type={}, user_id={}",
            item.id,
            item.item_type,
            item.user_id
        );
        Ok(item)
    }

    pub async fn get_items(&self, item_type: ItemType) -> AppResult<Vec<Item>> {
        self.store
            .find_items(&ItemFilter::of_type(item_type))
            .await
            .map_err(|e| self.degrade("get_items", e))
    }

    pub async fn get_lost_items(&self) -> AppResult<Vec<Item>> {
        self.get_items(ItemType::Lost).await
    }

    pub async fn get_found_items(&self) -> AppResult<Vec<Item>> {
        self.get_items(ItemType::Found).await
    }

    pub async fn get_item_by_id(&self, id: &str) -> AppResult<Option<Item>> {
        self.store
            .find_item(id)
            .await
            .map_err(|e| self.degrade("get_item_by_id", e))
    }

    /// The user's lost items followed by their found items, each newest first.
    pub async fn get_user_items(&self, user_id: &str) -> AppResult<Vec<Item>> {
        let mut items = self
            .store
            .find_items(&ItemFilter::of_type(ItemType::Lost).owned_by(user_id))
            .await
            .map_err(|e| self.degrade("get_user_items", e))?;
        let found = self
            .store
            .find_items(&ItemFilter::of_type(ItemType::Found).owned_by(user_id))
            .await
            .map_err(|e| self.degrade("get_user_items", e))?;
        items.extend(found);
        Ok(items)
    }

    /// `None` when the item does not exist or is not owned by `actor`.
    pub async fn update_item_status(
        &self,
        actor: &User,
        item_id: &str,
        status: ItemStatus,
    ) -> AppResult<Option<Item>> {
        let updated = self.store.update_item_status(item_id, &actor.id, status).await?;
        match &updated {
            Some(item) => tracing::info!(
                "Item status updated: id={}, status={}, user_id={}",
                item.id,
                item.status,
                actor.id
            ),
            None => tracing::info!(
                "Item status update refused: id={}, user_id={}",
                item_id,
                actor.id
            ),
        }
        Ok(updated)
    }

    /// `true` only when the item existed and belonged to `actor`.
    pub async fn delete_item(&self, actor: &User, item_id: &str) -> AppResult<bool> {
        let deleted = self.store.delete_item(item_id, &actor.id).await?;
        tracing::info!(
            "Delete item: id={}, user_id={}, deleted={}",
            item_id,
            actor.id,
            deleted
        );
        Ok(deleted)
    }

    /// Candidates of the opposite type sharing the category or a significant
    /// name word with the given item. Empty when the item does not exist.
    pub async fn find_potential_matches(&self, item_id: &str) -> AppResult<Vec<Item>> {
        let source = match self.get_item_by_id(item_id).await? {
            Some(item) => item,
            None => return Ok(Vec::new()),
        };
        let candidates = self.get_items(source.item_type.opposite()).await?;
        let matches = matching::potential_matches(&source, candidates);
        tracing::debug!(
            "Potential matches: id={}, type={}, count={}",
            source.id,
            source.item_type,
            matches.len()
        );
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ImageUpload;
    use crate::storage::LocalStore;
    use chrono::{Duration, TimeZone};

    /// Backend whose every call fails, as an unreachable database would.
    struct FailingStore;

    #[tonic::async_trait]
    impl Store for FailingStore {
        fn backend_name(&self) -> &'static str {
            "failing"
        }
        async fn ping(&self) -> AppResult<()> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn insert_user(&self, _user: &UserRecord) -> AppResult<()> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn find_user_by_email(&self, _email: &str) -> AppResult<Option<UserRecord>> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn find_user_by_id(&self, _id: &str) -> AppResult<Option<UserRecord>> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn insert_item(&self, _item: &Item) -> AppResult<()> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn find_item(&self, _id: &str) -> AppResult<Option<Item>> {
            Err(AppError::Database(sqlx::Error::PoolTimedOut))
        }
        async fn find_items(&self, _filter: &ItemFilter) -> AppResult<Vec<Item>> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn update_item_status(
            &self,
            _id: &str,
            _owner_id: &str,
            _status: ItemStatus,
        ) -> AppResult<Option<Item>> {
            Err(AppError::Storage("connection refused".to_string()))
        }
        async fn delete_item(&self, _id: &str, _owner_id: &str) -> AppResult<bool> {
            Err(AppError::Storage("connection refused".to_string()))
        }
    }

    fn catalog() -> Catalog {
        Catalog::new(Arc::new(LocalStore::in_memory()))
    }

    fn owner(id: &str) -> User {
        User {
            id: id.to_string(),
            email: format!("{}@campus.edu", id),
            name: format!("Owner {}", id),
        }
    }

    fn form(name: &str, category: &str) -> NewItem {
        NewItem {
            name: name.to_string(),
            category: category.to_string(),
            location: "Library".to_string(),
            date: "2024-03-01".to_string(),
            description: "left near the entrance".to_string(),
            contact_info: "555-0100".to_string(),
            image: None,
        }
    }

    #[tokio::test]
    async fn test_create_user_normalizes_and_hashes() {
        let catalog = catalog();
        let record = catalog.create_user(" Alice@Campus.edu ", "s3cret!", " Alice ").await.unwrap();
        assert_eq!(record.email, "alice@campus.edu");
        assert_eq!(record.name, "Alice");
        assert_ne!(record.password_hash, "s3cret!");
        assert!(Uuid::parse_str(&record.id).is_ok());

        let found = catalog.find_user_by_email("ALICE@campus.edu").await.unwrap().unwrap();
        assert_eq!(found, record);
        assert_eq!(catalog.find_user_by_id(&record.id).await.unwrap(), Some(User::from(&record)));
    }

    #[tokio::test]
    async fn test_create_lost_item() {
        let catalog = catalog();
        let alice = owner("alice");
        let item = catalog.create_item(form("Blue Backpack", "Bags"), ItemType::Lost, &alice).await.unwrap();

        assert_eq!(item.status, ItemStatus::Searching);
        assert_eq!(item.user_id, "alice");
        assert_eq!(item.user_name, "Owner alice");
        assert_eq!(item.image_url, image::PLACEHOLDER_IMAGE);
        assert!(Uuid::parse_str(&item.id).is_ok());

        let lost = catalog.get_lost_items().await.unwrap();
        assert_eq!(lost, vec![item.clone()]);
        assert!(catalog.get_found_items().await.unwrap().is_empty());
        assert_eq!(catalog.get_item_by_id(&item.id).await.unwrap(), Some(item));
    }

    #[tokio::test]
    async fn test_create_item_with_image() {
        let catalog = catalog();
        let mut new = form("Camera", "Electronics");
        new.image = Some(ImageUpload {
            content_type: "image/jpeg".to_string(),
            data: vec![0xff, 0xd8, 0xff],
        });
        let item = catalog.create_item(new, ItemType::Found, &owner("bob")).await.unwrap();
        assert!(item.image_url.starts_with("data:image/jpeg;base64,"));
    }

    #[tokio::test]
    async fn test_create_item_requires_fields() {
        let catalog = catalog();
        let err = catalog
            .create_item(form("  ", "Bags"), ItemType::Lost, &owner("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(ref m) if m == "name is required"));
        assert!(catalog.get_lost_items().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_update_is_owner_gated() {
        let catalog = catalog();
        let alice = owner("alice");
        let item = catalog.create_item(form("Keys", "Keys"), ItemType::Lost, &alice).await.unwrap();

        let refused = catalog
            .update_item_status(&owner("mallory"), &item.id, ItemStatus::Resolved)
            .await
            .unwrap();
        assert!(refused.is_none());

        let updated = catalog
            .update_item_status(&alice, &item.id, ItemStatus::Resolved)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.status, ItemStatus::Resolved);

        let missing = catalog
            .update_item_status(&alice, "no-such-id", ItemStatus::Resolved)
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_delete_is_owner_gated() {
        let catalog = catalog();
        let alice = owner("alice");
        let item = catalog.create_item(form("Wallet", "Wallets"), ItemType::Found, &alice).await.unwrap();

        assert!(!catalog.delete_item(&owner("mallory"), &item.id).await.unwrap());
        assert!(catalog.get_item_by_id(&item.id).await.unwrap().is_some());

        assert!(catalog.delete_item(&alice, &item.id).await.unwrap());
        assert!(catalog.get_item_by_id(&item.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_matches_for_missing_item_are_empty() {
        assert!(catalog().find_potential_matches("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_matches_come_from_opposite_list() {
        let catalog = catalog();
        let alice = owner("alice");
        let bob = owner("bob");
        let lost = catalog.create_item(form("Blue Backpack", "Bags"), ItemType::Lost, &alice).await.unwrap();
        catalog.create_item(form("Green Backpack", "Bags"), ItemType::Lost, &bob).await.unwrap();
        let found = catalog.create_item(form("Red Purse", "Bags"), ItemType::Found, &bob).await.unwrap();

        let matches = catalog.find_potential_matches(&lost.id).await.unwrap();
        assert_eq!(matches, vec![found.clone()]);

        let reverse = catalog.find_potential_matches(&found.id).await.unwrap();
        assert_eq!(reverse.len(), 2);
        assert!(reverse.iter().all(|i| i.item_type == ItemType::Lost));
    }

    #[tokio::test]
    async fn test_user_items_are_lost_then_found() {
        let store = Arc::new(LocalStore::in_memory());
        let catalog = Catalog::new(store.clone());
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();

        for (id, item_type, minutes) in [
            ("lost_old", ItemType::Lost, 0),
            ("lost_new", ItemType::Lost, 10),
            ("found_old", ItemType::Found, 20),
            ("found_new", ItemType::Found, 30),
            ("someone_else", ItemType::Lost, 40),
        ] {
            let item = Item {
                id: id.to_string(),
                name: "Scarf".to_string(),
                category: "Clothing".to_string(),
                location: "Gym".to_string(),
                date: "2024-03-01".to_string(),
                description: String::new(),
                image_url: image::PLACEHOLDER_IMAGE.to_string(),
                user_id: if id == "someone_else" { "bob" } else { "alice" }.to_string(),
                user_name: "Alice".to_string(),
                contact_info: String::new(),
                created_at: base + Duration::minutes(minutes),
                item_type,
                status: ItemStatus::Searching,
            };
            store.insert_item(&item).await.unwrap();
        }

        let ids: Vec<_> = catalog
            .get_user_items("alice")
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["lost_new", "lost_old", "found_new", "found_old"]);
    }

    #[tokio::test]
    async fn test_read_failures_are_unavailable() {
        let catalog = Catalog::new(Arc::new(FailingStore));

        let err = catalog.get_lost_items().await.unwrap_err();
        assert!(matches!(err, AppError::Unavailable(ref m) if m.contains("connection refused")));
        assert!(matches!(catalog.get_item_by_id("i1").await, Err(AppError::Unavailable(_))));
        assert!(matches!(catalog.get_user_items("alice").await, Err(AppError::Unavailable(_))));
        assert!(matches!(catalog.find_user_by_email("a@campus.edu").await, Err(AppError::Unavailable(_))));
        assert!(matches!(catalog.find_potential_matches("i1").await, Err(AppError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_write_failures_propagate_unchanged() {
        let catalog = Catalog::new(Arc::new(FailingStore));
        let err = catalog
            .create_item(form("Keys", "Keys"), ItemType::Lost, &owner("alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert!(matches!(
            catalog.delete_item(&owner("alice"), "i1").await,
            Err(AppError::Storage(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_listing_is_ok() {
        assert_eq!(catalog().get_found_items().await.unwrap(), Vec::new());
    }
}
