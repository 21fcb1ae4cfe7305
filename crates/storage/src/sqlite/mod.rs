use std::sync::Arc;
use std::time::Duration;

use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::Storage;

mod mapping;
mod migrate;
mod progress_repo;
mod question_repo;
mod result_repo;

/// Applied to every pooled connection.
const CONNECTION_PRAGMAS: [&str; 3] = [
    "PRAGMA foreign_keys = ON;",
    "PRAGMA journal_mode = WAL;",
    "PRAGMA busy_timeout = 5000;",
];

/// Question bank, result log and progress snapshot in one `SQLite` file.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect and bring the schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn open(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|db, _meta| {
                Box::pin(async move {
                    for pragma in CONNECTION_PRAGMAS {
                        sqlx::query(pragma).execute(&mut *db).await?;
                    }
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;

        let repo = Self { pool };
        repo.migrate().await?;
        tracing::debug!(url = database_url, "quiz database ready");
        Ok(repo)
    }

    /// Apply pending schema versions. Safe to call repeatedly.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if a migration query fails.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Every repository backed by the same `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the database cannot be opened or migrated.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::open(database_url).await?;
        Ok(Self {
            questions: Arc::new(repo.clone()),
            results: Arc::new(repo.clone()),
            progress: Arc::new(repo),
        })
    }
}
