use crate::model::{NotificationCache, PollState};
use anyhow::{Context, Result};
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let normalized = prepare_sqlite_url(database_url);
    let options = SqliteConnectOptions::from_str(&normalized)
        .with_context(|| format!("invalid database url {normalized}"))?
        .create_if_missing(true);
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

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run database migrations")?;
    Ok(())
}

/// If using a file-backed SQLite URL, expand a leading `~/` and ensure the parent
/// directory exists. Leaves in-memory URLs untouched. Returns possibly-updated URL.
fn prepare_sqlite_url(url: &str) -> String {
    if !url.starts_with("sqlite:") || url.starts_with("sqlite::memory") {
        return url.to_string();
    }

    let rest = &url["sqlite:".len()..];
    let path_with_query = rest.strip_prefix("//").unwrap_or(rest);
    let (path_part, query_part) = match path_with_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_with_query, None),
    };
    if path_part.is_empty() {
        return url.to_string();
    }

    let expanded_path = match (path_part.strip_prefix("~/"), std::env::var("HOME")) {
        (Some(rest), Ok(home)) => format!("{}/{}", home.trim_end_matches('/'), rest),
        _ => path_part.to_string(),
    };

    if let Some(parent) = std::path::Path::new(&expanded_path).parent() {
        if !parent.as_os_str().is_empty() {
            let _ = std::fs::create_dir_all(parent);
        }
    }

    let mut rebuilt = String::from("sqlite://");
    rebuilt.push_str(&expanded_path);
    if let Some(q) = query_part {
        rebuilt.push('?');
        rebuilt.push_str(q);
    }
    rebuilt
}

#[instrument(skip_all)]
pub async fn load_poll_state(pool: &Pool) -> Result<Option<PollState>> {
    let row = sqlx::query(
        "SELECT checkpoint, last_status_message, last_error_message FROM poll_state WHERE id = 1",
    )
    .fetch_optional(pool)
    .await?;

    row.map(|row| -> Result<PollState> {
        Ok(PollState {
            checkpoint: row.try_get("checkpoint")?,
            cache: NotificationCache {
                last_status: row.try_get("last_status_message")?,
                last_error: row.try_get("last_error_message")?,
            },
        })
    })
    .transpose()
}

#[instrument(skip_all, fields(checkpoint = state.checkpoint))]
pub async fn save_poll_state(pool: &Pool, state: &PollState) -> Result<()> {
    sqlx::query(
        "INSERT INTO poll_state (id, checkpoint, last_status_message, last_error_message, updated_at)
         VALUES (1, ?, ?, ?, CURRENT_TIMESTAMP)
         ON CONFLICT(id) DO UPDATE SET
             checkpoint = excluded.checkpoint,
             last_status_message = excluded.last_status_message,
             last_error_message = excluded.last_error_message,
             updated_at = CURRENT_TIMESTAMP",
    )
    .bind(state.checkpoint)
    .bind(state.cache.last_status.as_deref())
    .bind(state.cache.last_error.as_deref())
    .execute(pool)
    .await?;
    Ok(())
}
