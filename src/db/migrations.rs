//! Event cache schema and SQLite initialization.

use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

/// Bumped whenever `schema.sql` changes shape.
pub const SCHEMA_VERSION: i64 = 1;

/// Open (creating if needed) the event cache at `db_path` and bring its schema up to date.
///
/// `:memory:` gives a private in-memory cache on a single connection.
pub async fn init_db(db_path: &str) -> Result<SqlitePool, sqlx::Error> {
    let in_memory = db_path == ":memory:";
    if !in_memory {
        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", db_path))?
        .create_if_missing(true)
        .foreign_keys(true)
        .busy_timeout(std::time::Duration::from_millis(5000));

    let pool = SqlitePoolOptions::new()
        // Every in-memory connection is its own database.
        .max_connections(if in_memory { 1 } else { 5 })
        .after_connect(move |conn, _meta| {
            Box::pin(async move { configure_pragmas_conn(conn, in_memory).await })
        })
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Event cache ready at {}", db_path);
    Ok(pool)
}

/// Apply `schema.sql` unless the database already carries the current version.
async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let current: i64 = sqlx::query("PRAGMA user_version")
        .fetch_one(pool)
        .await?
        .get(0);
    if current >= SCHEMA_VERSION {
        debug!("Schema at version {}, nothing to migrate", current);
        return Ok(());
    }

    info!("Migrating event cache schema {} -> {}", current, SCHEMA_VERSION);
    let schema_sql = include_str!("schema.sql");

    let mut tx = pool.begin().await?;
    for statement in schema_sql.split(';') {
        let trimmed = statement.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(&mut *tx).await?;
        }
    }
    // PRAGMA does not accept bound parameters.
    sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    Ok(())
}

async fn configure_pragmas_conn(
    conn: &mut SqliteConnection,
    in_memory: bool,
) -> Result<(), sqlx::Error> {
    if !in_memory {
        // journal_mode returns the mode actually in effect.
        let row = sqlx::query("PRAGMA journal_mode = WAL")
            .fetch_one(&mut *conn)
            .await?;
        let journal_mode: String = row.get(0);
        debug!("SQLite journal_mode set to: {}", journal_mode);
    }

    sqlx::query("PRAGMA synchronous = NORMAL")
        .execute(&mut *conn)
        .await?;
    Ok(())
}
