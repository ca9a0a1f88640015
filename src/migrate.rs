use anyhow::Result;
use sqlx::SqlitePool;

/// Create the key-value table backing persisted state. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One JSON document per key: documents, chunks, chat history.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS kv_store (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
