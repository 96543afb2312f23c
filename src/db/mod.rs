//! Database module for mailroom.
//!
//! This module provides the sqlx connection pool and migration management.
//! SQLite is the default backend; PostgreSQL is available through the
//! `postgres` feature.

mod schema;

pub use schema::MIGRATIONS;

use std::time::Duration;

use tokio::time::{interval, Instant};
use tracing::{debug, info, warn};

use crate::config::DatabaseConfig;
use crate::{MailroomError, Result};

/// Database backend selected at compile time.
#[cfg(feature = "sqlite")]
pub type DbBackend = sqlx::Sqlite;

/// Database backend selected at compile time.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub type DbBackend = sqlx::Postgres;

/// Connection pool for the selected backend.
pub type DbPool = sqlx::Pool<DbBackend>;

type DbPoolOptions = sqlx::pool::PoolOptions<DbBackend>;

/// Database wrapper owning the connection pool.
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
}

impl Database {
    /// Open a connection pool for the configured URL and apply migrations.
    pub async fn open(config: &DatabaseConfig) -> Result<Self> {
        info!("Opening database at {}", redact_url(&config.url));

        let options = connect_options(&config.url)?;
        let pool = DbPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .max_lifetime(Some(Duration::from_secs(config.conn_max_lifetime_secs)))
            .connect_with(options)
            .await
            .map_err(|e| MailroomError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Open the database, retrying once per second until
    /// `connect_wait_secs` has elapsed.
    ///
    /// Ctrl-C aborts the wait. A zero wait makes a single attempt.
    pub async fn open_with_wait(config: &DatabaseConfig) -> Result<Self> {
        if config.connect_wait_secs == 0 {
            return Self::open(config).await;
        }

        let deadline = Instant::now() + Duration::from_secs(config.connect_wait_secs);
        let mut retry = interval(Duration::from_secs(1));
        retry.tick().await;

        loop {
            match Self::open(config).await {
                Ok(db) => return Ok(db),
                Err(e) if Instant::now() >= deadline => {
                    return Err(MailroomError::DatabaseConnection(format!(
                        "database not ready after {}s: {}",
                        config.connect_wait_secs, e
                    )));
                }
                Err(e) => warn!("Database not ready yet: {}", e),
            }

            tokio::select! {
                _ = retry.tick() => {}
                _ = tokio::signal::ctrl_c() => {
                    return Err(MailroomError::DatabaseConnection(
                        "database readiness check interrupted".to_string(),
                    ));
                }
            }
        }
    }

    /// Open an in-memory database for testing.
    ///
    /// The pool holds exactly one connection, since every SQLite in-memory
    /// connection is a separate database.
    #[cfg(feature = "sqlite")]
    pub async fn open_in_memory() -> Result<Self> {
        use std::str::FromStr;

        debug!("Opening in-memory database");
        let options = sqlx::sqlite::SqliteConnectOptions::from_str("sqlite::memory:")?;
        let pool = DbPoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| MailroomError::DatabaseConnection(e.to_string()))?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Get the current schema version.
    pub async fn schema_version(&self) -> Result<i64> {
        if !self.table_exists("schema_version").await? {
            return Ok(0);
        }
        let version: i64 = sqlx::query_scalar("SELECT COALESCE(MAX(version), 0) FROM schema_version")
            .fetch_one(&self.pool)
            .await?;
        Ok(version)
    }

    /// Apply pending migrations, each in its own transaction.
    pub async fn migrate(&self) -> Result<()> {
        let current_version = self.schema_version().await?;

        if current_version as usize >= MIGRATIONS.len() {
            debug!("Database is up to date (version {})", current_version);
            return Ok(());
        }

        info!(
            "Migrating database from version {} to {}",
            current_version,
            MIGRATIONS.len()
        );

        sqlx::raw_sql("CREATE TABLE IF NOT EXISTS schema_version (version BIGINT PRIMARY KEY)")
            .execute(&self.pool)
            .await?;

        for (i, migration) in MIGRATIONS.iter().enumerate().skip(current_version as usize) {
            let version = (i + 1) as i64;
            info!("Applying migration v{}", version);

            let mut tx = self.pool.begin().await?;
            sqlx::raw_sql(*migration).execute(&mut *tx).await?;
            sqlx::query("INSERT INTO schema_version (version) VALUES ($1)")
                .bind(version)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;

            debug!("Migration v{} applied successfully", version);
        }

        info!(
            "Database migration complete (now at version {})",
            MIGRATIONS.len()
        );
        Ok(())
    }

    /// Check if a table exists.
    #[cfg(feature = "sqlite")]
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = $1")
                .bind(table_name)
                .fetch_one(&self.pool)
                .await?;
        Ok(count > 0)
    }

    /// Check if a table exists.
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    pub async fn table_exists(&self, table_name: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM information_schema.tables
             WHERE table_schema = current_schema() AND table_name = $1",
        )
        .bind(table_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Close the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Database pool closed");
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}

#[cfg(feature = "sqlite")]
fn connect_options(url: &str) -> Result<sqlx::sqlite::SqliteConnectOptions> {
    use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};
    use std::str::FromStr;

    let options = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .foreign_keys(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5));

    // Create parent directories if they don't exist
    if let Some(parent) = options.get_filename().parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }

    Ok(options)
}

#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
fn connect_options(url: &str) -> Result<sqlx::postgres::PgConnectOptions> {
    use std::str::FromStr;

    Ok(sqlx::postgres::PgConnectOptions::from_str(url)?)
}

/// Hide the password part of a connection URL for logging.
fn redact_url(url: &str) -> String {
    let Some((scheme, rest)) = url.split_once("://") else {
        return url.to_string();
    };
    match rest.split_once('@') {
        Some((credentials, host)) => {
            let user = credentials.split(':').next().unwrap_or_default();
            format!("{scheme}://{user}:***@{host}")
        }
        None => url.to_string(),
    }
}
