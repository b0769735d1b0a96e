//! Async handle over the SQLite file.
//!
//! rusqlite is synchronous, so every operation runs on tokio's blocking pool
//! with a connection of its own. Under WAL this lets readers proceed while a
//! writer holds the lock.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use becoming_store::{Database, StoreError};

use crate::error::ServerError;

#[derive(Clone)]
pub struct Store {
    path: Arc<PathBuf>,
}

impl Store {
    /// Open the database once, running migrations, and keep its path for
    /// per-operation connections.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Database::open_at(path)?;
        Ok(Self {
            path: Arc::new(path.to_path_buf()),
        })
    }

    /// Run `f` in a deferred (snapshot) transaction.
    pub async fn read<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
        T: Send + 'static,
    {
        self.run(move |db| db.read(f)).await
    }

    /// Run `f` in an immediate (write-locking) transaction.
    pub async fn write<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
        T: Send + 'static,
    {
        self.run(move |db| db.write(f)).await
    }

    async fn run<T, F>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Database) -> Result<T, ServerError> + Send + 'static,
        T: Send + 'static,
    {
        let path = Arc::clone(&self.path);
        tokio::task::spawn_blocking(move || {
            let db = Database::connect(&path)?;
            f(&db)
        })
        .await
        .map_err(|e| ServerError::Internal(format!("store task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failed_write_is_rolled_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("t.db")).unwrap();

        let result: Result<(), ServerError> = store
            .write(|db| {
                db.conn()
                    .execute(
                        "INSERT INTO users (id, name, email, password_hash, created_at)
                         VALUES ('u1', 'n', 'e@x.com', 'h', '2024-01-01T00:00:00.000000Z')",
                        [],
                    )
                    .map_err(StoreError::from)?;
                Err(ServerError::Validation("abort".into()))
            })
            .await;
        assert!(matches!(result, Err(ServerError::Validation(_))));

        let count: i64 = store
            .read(|db| {
                db.conn()
                    .query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))
                    .map_err(|e| StoreError::from(e).into())
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }
}
