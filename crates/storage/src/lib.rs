use anyhow::{ensure, Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::debug;

/// Row-addressed tabular store. Rows are 1-based; row 1 is reserved for the header.
#[async_trait]
pub trait Sheet: Send + Sync {
    /// Index of the last occupied row, or 0 when the sheet is empty.
    async fn last_row(&self) -> Result<u64>;

    /// Writes `cells` at `row`, replacing whatever was there.
    async fn write_row(&self, row: u64, cells: &[String]) -> Result<()>;

    async fn read_row(&self, row: u64) -> Result<Option<Vec<String>>>;
}

#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // An in-memory sheet lives only as long as its single connection.
        let pool_options = if database_url.starts_with("sqlite::memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(5)
        };
        let pool = pool_options
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open sheet database '{database_url}'"))?;
        let storage = Self { pool };
        storage.ensure_sheet_table().await?;
        Ok(storage)
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_sheet_table(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sheet_rows (
                row_index  INTEGER PRIMARY KEY,
                cells      TEXT NOT NULL,
                written_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure sheet_rows table exists")?;
        Ok(())
    }
}

#[async_trait]
impl Sheet for Storage {
    async fn last_row(&self) -> Result<u64> {
        let last: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(row_index), 0) FROM sheet_rows")
            .fetch_one(&self.pool)
            .await
            .context("failed to read last sheet row")?;
        Ok(u64::try_from(last).unwrap_or_default())
    }

    async fn write_row(&self, row: u64, cells: &[String]) -> Result<()> {
        ensure!(row >= 1, "sheet rows are 1-based, got row {row}");
        let index = i64::try_from(row).context("row index out of range")?;
        let encoded = serde_json::to_string(cells).context("failed to encode row cells")?;

        sqlx::query(
            "INSERT INTO sheet_rows (row_index, cells, written_at) VALUES (?, ?, ?)
             ON CONFLICT(row_index) DO UPDATE SET cells = excluded.cells, written_at = excluded.written_at",
        )
        .bind(index)
        .bind(encoded)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write sheet row {row}"))?;

        debug!(row, width = cells.len(), "sheet row written");
        Ok(())
    }

    async fn read_row(&self, row: u64) -> Result<Option<Vec<String>>> {
        let Ok(index) = i64::try_from(row) else {
            return Ok(None);
        };
        let record = sqlx::query("SELECT cells FROM sheet_rows WHERE row_index = ?")
            .bind(index)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read sheet row {row}"))?;

        record
            .map(|r| {
                let raw = r.get::<String, _>(0);
                serde_json::from_str(&raw)
                    .with_context(|| format!("sheet row {row} holds malformed cells"))
            })
            .transpose()
    }
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url.starts_with("sqlite::memory:") || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
