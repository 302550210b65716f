//! SQLite connectivity for the conversion history.
//!
//! One small wrapper owns the pool: file databases get WAL mode and a
//! busy timeout so concurrent pipeline writers and history readers
//! coexist, and the schema migrations under `migrations/` run on every
//! open. Tests use the in-memory variant.

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use thiserror::Error;
use tracing::instrument;

/// Pool size for file databases. SQLite locks at file granularity, so a
/// handful of connections is plenty.
const MAX_POOL_CONNECTIONS: u32 = 5;

/// How long a connection waits on a locked database before erroring.
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Errors opening or migrating the history database.
#[derive(Error, Debug)]
pub enum DbError {
    /// The database could not be opened or queried.
    #[error("failed to connect to database: {0}")]
    Connection(#[from] sqlx::Error),

    /// A schema migration failed to apply.
    #[error("failed to run migrations: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Cloneable handle over the history database's connection pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (creating if absent) the history database at `db_path`,
    /// enables WAL journaling, and applies pending migrations.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the database cannot be opened,
    /// or [`DbError::Migration`] if a migration fails.
    #[instrument(skip(db_path), fields(path = %db_path.display()))]
    pub async fn new(db_path: &Path) -> Result<Self, DbError> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(MAX_POOL_CONNECTIONS)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Opens a private in-memory database with migrations applied.
    ///
    /// Capped at one connection: each in-memory connection is its own
    /// database, so a second connection would see an empty schema.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Connection`] if the connection fails,
    /// or [`DbError::Migration`] if migrations fail.
    #[instrument]
    pub async fn new_in_memory() -> Result<Self, DbError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns the underlying connection pool for query execution.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Closes every pooled connection, flushing the WAL back into the
    /// main database file. Call once all stores over this handle are done.
    #[instrument(skip(self))]
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
