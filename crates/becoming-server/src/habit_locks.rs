//! In-process per-habit mutation locks.
//!
//! Writes to the same habit are serialized so that a complete racing an
//! uncomplete (or a delete) observes a single order. Distinct habits never
//! contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct HabitLocks {
    locks: Arc<Mutex<HashMap<Uuid, Arc<Mutex<()>>>>>,
}

impl HabitLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `habit_id`. The lock is released when
    /// the guard drops.
    pub async fn acquire(&self, habit_id: Uuid) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            Arc::clone(locks.entry(habit_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Drop entries nobody is holding or waiting on.
    pub async fn purge_idle(&self) {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        let purged = before - locks.len();
        if purged > 0 {
            tracing::debug!(purged, remaining = locks.len(), "Purged idle habit locks");
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_habit_is_serialized() {
        let locks = HabitLocks::new();
        let habit = Uuid::new_v4();

        let guard = locks.acquire(habit).await;
        let contender = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = contender.acquire(habit).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(guard);
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn test_distinct_habits_do_not_block() {
        let locks = HabitLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_purge_keeps_held_locks() {
        let locks = HabitLocks::new();
        let held = Uuid::new_v4();
        let _guard = locks.acquire(held).await;
        drop(locks.acquire(Uuid::new_v4()).await);

        locks.purge_idle().await;
        assert_eq!(locks.len().await, 1);
    }
}
