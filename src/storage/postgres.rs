use sqlx::PgPool;

use crate::error::{AppError, AppResult};
use crate::models::{Item, ItemRow, ItemStatus, UserRecord};

use super::{ItemFilter, Store};

const USER_COLUMNS: &str = "id, email, name, password_hash";
const ITEM_COLUMNS: &str = "id, item_type, name, category, location, date, description, \
     image_url, user_id, user_name, contact_info, status, created_at";

pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

}

fn rows_to_items(rows: Vec<ItemRow>) -> AppResult<Vec<Item>> {
    rows.into_iter().map(Item::try_from).collect()
}

/// Builds the listing query for `filter`; placeholders are numbered in the
/// order `item_type`, `user_id`.
fn list_items_sql(filter: &ItemFilter) -> String {
    let mut conditions = Vec::new();
    let mut param_idx = 1u32;

    if filter.item_type.is_some() {
        conditions.push(format!("item_type = ${}", param_idx));
        param_idx += 1;
    }
    if filter.user_id.is_some() {
        conditions.push(format!("user_id = ${}", param_idx));
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {} ", conditions.join(" AND "))
    };

    format!(
        "SELECT {} FROM items {}ORDER BY created_at DESC",
        ITEM_COLUMNS, where_clause
    )
}

#[tonic::async_trait]
impl Store for PgStore {
    fn backend_name(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_user(&self, user: &UserRecord) -> AppResult<()> {
        sqlx::query("INSERT INTO users (id, email, name, password_hash) VALUES ($1, $2, $3, $4)")
            .bind(&user.id)
            .bind(&user.email)
            .bind(&user.name)
            .bind(&user.password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    AppError::Conflict("Email already registered".to_string())
                }
                e => AppError::Database(e),
            })?;
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        let sql = format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_user_by_id(&self, id: &str) -> AppResult<Option<UserRecord>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let user = sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn insert_item(&self, item: &Item) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO items (id, item_type, name, category, location, date, description, \
             image_url, user_id, user_name, contact_info, status, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(&item.id)
        .bind(item.item_type.as_str())
        .bind(&item.name)
        .bind(&item.category)
        .bind(&item.location)
        .bind(&item.date)
        .bind(&item.description)
        .bind(&item.image_url)
        .bind(&item.user_id)
        .bind(&item.user_name)
        .bind(&item.contact_info)
        .bind(item.status.as_str())
        .bind(item.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_item(&self, id: &str) -> AppResult<Option<Item>> {
        let sql = format!("SELECT {} FROM items WHERE id = $1", ITEM_COLUMNS);
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Item::try_from).transpose()
    }

    async fn find_items(&self, filter: &ItemFilter) -> AppResult<Vec<Item>> {
        let sql = list_items_sql(filter);

        let mut query = sqlx::query_as::<_, ItemRow>(&sql);
        if let Some(item_type) = filter.item_type {
            query = query.bind(item_type.as_str());
        }
        if let Some(ref user_id) = filter.user_id {
            query = query.bind(user_id);
        }

        let rows = query.fetch_all(&self.pool).await?;
        rows_to_items(rows)
    }

    async fn update_item_status(
        &self,
        id: &str,
        owner_id: &str,
        status: ItemStatus,
    ) -> AppResult<Option<Item>> {
        let sql = format!(
            "UPDATE items SET status = $1 WHERE id = $2 AND user_id = $3 RETURNING {}",
            ITEM_COLUMNS
        );
        let row = sqlx::query_as::<_, ItemRow>(&sql)
            .bind(status.as_str())
            .bind(id)
            .bind(owner_id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Item::try_from).transpose()
    }

    async fn delete_item(&self, id: &str, owner_id: &str) -> AppResult<bool> {
        let rows_affected = sqlx::query("DELETE FROM items WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(rows_affected > 0)
    }
}
