//! Key-value settings slots. Each key is a single global slot, overwritten
//! on every write; the "last imported file" bookkeeping lives here instead
//! of in ambient mutable state.

use sqlx::SqlitePool;

use crate::error::AppResult;
use crate::time::now_ms;

pub const DERNIER_IMPORT_FICHIER: &str = "dernier_import_fichier";
pub const DERNIER_IMPORT_DATE: &str = "dernier_import_date";
pub const DERNIER_EXPORT_DATE: &str = "dernier_export_date";

pub async fn get(pool: &SqlitePool, key: &str) -> AppResult<Option<String>> {
    Ok(
        sqlx::query_scalar("SELECT value FROM settings WHERE key = ?1")
            .bind(key)
            .fetch_optional(pool)
            .await?,
    )
}

pub async fn set(pool: &SqlitePool, key: &str, value: &str) -> AppResult<()> {
    sqlx::query(
        "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, ?3) \
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
    )
    .bind(key)
    .bind(value)
    .bind(now_ms())
    .execute(pool)
    .await?;
    Ok(())
}
