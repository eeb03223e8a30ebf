//! Store connection management
//!
//! Single embedded SQLite database with write-ahead logging. Writes are
//! serialized through one async mutex; reads go straight to the pool and
//! only block during a write transaction.

use std::path::Path;

use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use tokio::sync::{Mutex, MutexGuard};

/// Handle to the embedded store. Cheap to clone via `Arc` in `AppState`;
/// repositories borrow it per call.
#[derive(Debug)]
pub struct Store {
    pool: SqlitePool,
    write_lock: Mutex<()>,
}

impl Store {
    /// Open (creating if missing) the database at `path`
    pub async fn open(path: &Path, max_connections: u32) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("temp_store", "MEMORY");

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self {
            pool,
            write_lock: Mutex::new(()),
        })
    }

    /// Read access to the pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Acquire the single-writer lock. Hold the guard for the duration of
    /// every statement that mutates the database.
    pub async fn write(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }
}
