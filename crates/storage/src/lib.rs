mod dm;
mod employee;
mod notification;
mod reply;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{migrate::MigrateError, sqlite::SqlitePoolOptions, SqlitePool};
use thiserror::Error;

pub use dm::{
    DmRepository, DmStoreError, NewDirectMessage, NewDmThread, UpdateDirectMessage,
};
pub use employee::{EmployeeError, EmployeeRepository, NewEmployee};
pub use notification::{NotificationError, NotificationFeedItem, NotificationRepository};
pub use reply::{NewDmReply, ReplyError, ReplyRepository};

/// Top-level database handle that owns the SQLite connection pool.
#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Establishes a new SQLite connection pool for the provided connection string.
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(StorageError::Connect)?;

        apply_pragmas(&pool).await?;

        Ok(Self { pool })
    }

    /// Applies migrations located under `migrations/`.
    pub async fn run_migrations(&self) -> Result<(), StorageError> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(StorageError::Migration)?;
        Ok(())
    }

    /// Returns a handle to operate on employees.
    pub fn employees(&self) -> EmployeeRepository {
        EmployeeRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle to operate on notifications and their visibility rows.
    pub fn notifications(&self) -> NotificationRepository {
        NotificationRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle to operate on direct messages, threads and membership.
    pub fn dms(&self) -> DmRepository {
        DmRepository {
            pool: self.pool.clone(),
        }
    }

    /// Returns a handle to operate on thread replies.
    pub fn replies(&self) -> ReplyRepository {
        ReplyRepository {
            pool: self.pool.clone(),
        }
    }

    /// Exposes the inner pool when lower level access is required.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

async fn apply_pragmas(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query("PRAGMA foreign_keys = ON;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA journal_mode = WAL;")
        .fetch_one(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA synchronous = NORMAL;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    sqlx::query("PRAGMA busy_timeout = 5000;")
        .execute(pool)
        .await
        .map_err(StorageError::Pragma)?;

    Ok(())
}

/// General storage level errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to connect to sqlite: {0}")]
    Connect(sqlx::Error),
    #[error("failed to apply pragma: {0}")]
    Pragma(sqlx::Error),
    #[error("failed to run database migrations: {0}")]
    Migration(MigrateError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) fn to_rfc3339(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::atomic::{AtomicU64, Ordering};

    use chrono::Utc;
    use crewdeck_core::types::Position;

    use super::{Database, NewEmployee};

    static EMAIL_SEQ: AtomicU64 = AtomicU64::new(0);

    pub async fn setup_db() -> Database {
        let db = Database::connect("sqlite::memory:?cache=shared")
            .await
            .expect("connect");
        db.run_migrations().await.expect("migrations");
        db
    }

    pub async fn seed_employee(db: &Database, name: &str, position: Position) -> i64 {
        let seq = EMAIL_SEQ.fetch_add(1, Ordering::Relaxed);
        let email = format!("{name}-{seq}@crewdeck.test");
        db.employees()
            .insert(&NewEmployee {
                employee_name: name,
                email: &email,
                position,
                created_at: Utc::now(),
            })
            .await
            .expect("seed employee")
    }
}
