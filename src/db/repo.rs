use super::model::Subscription;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use thiserror::Error;
use tracing::instrument;

pub type Pool = SqlitePool;

/// Persistent-store failure. Fatal to the enclosing operation; the process
/// keeps running.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

pub async fn init_pool(database_url: &str) -> Result<Pool, StoreError> {
    ensure_parent_dir(database_url);
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;")
        .execute(&pool)
        .await?;
    sqlx::query("PRAGMA synchronous=FULL;")
        .execute(&pool)
        .await?;
    Ok(pool)
}

/// For a file-backed SQLite URL, make sure the parent directory exists so the
/// first connect can create the file. In-memory URLs pass through untouched.
fn ensure_parent_dir(url: &str) {
    let Some(rest) = url.strip_prefix("sqlite:") else {
        return;
    };
    if rest.starts_with(":memory") {
        return;
    }
    let path = rest.trim_start_matches("//");
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = std::path::Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }
}

pub async fn run_migrations(pool: &Pool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Replace this channel's subscription with `tracked`. Delete-then-insert
/// inside one transaction, so a concurrent broadcast snapshot sees either the
/// old row or the new one, never both or neither.
#[instrument(skip_all)]
pub async fn upsert_subscription(
    pool: &Pool,
    channel_id: i64,
    tracked: &str,
) -> Result<(), StoreError> {
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM subscriptions WHERE channel_id = ?")
        .bind(channel_id)
        .execute(&mut *tx)
        .await?;
    sqlx::query("INSERT INTO subscriptions (channel_id, tracked) VALUES (?, ?)")
        .bind(channel_id)
        .bind(tracked)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Remove this channel's subscription. Absence is not an error.
#[instrument(skip_all)]
pub async fn delete_subscription(pool: &Pool, channel_id: i64) -> Result<(), StoreError> {
    sqlx::query("DELETE FROM subscriptions WHERE channel_id = ?")
        .bind(channel_id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Snapshot of all current subscriptions, in store order.
#[instrument(skip_all)]
pub async fn list_subscriptions(pool: &Pool) -> Result<Vec<Subscription>, StoreError> {
    let rows = sqlx::query("SELECT channel_id, tracked FROM subscriptions ORDER BY id")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|row| Subscription {
            channel_id: row.get("channel_id"),
            tracked: row.get("tracked"),
        })
        .collect())
}
