use sqlx::PgPool;

/// Idempotent DDL applied at startup. Items of both types share one table,
/// discriminated by `item_type`.
pub const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id TEXT PRIMARY KEY,
        email TEXT NOT NULL,
        name TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users (LOWER(email))",
    "CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        item_type TEXT NOT NULL CHECK (item_type IN ('lost', 'found')),
        name TEXT NOT NULL,
        category TEXT NOT NULL,
        location TEXT NOT NULL,
        date TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        image_url TEXT NOT NULL,
        user_id TEXT NOT NULL REFERENCES users (id),
        user_name TEXT NOT NULL,
        contact_info TEXT NOT NULL DEFAULT '',
        status TEXT NOT NULL DEFAULT 'searching' CHECK (status IN ('searching', 'resolved')),
        created_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS items_type_created_idx ON items (item_type, created_at DESC)",
    "CREATE INDEX IF NOT EXISTS items_user_type_created_idx ON items (user_id, item_type, created_at DESC)",
];

pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    tracing::debug!("Schema ensured ({} statements)", SCHEMA.len());
    Ok(())
}
