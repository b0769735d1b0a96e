//! Operations behind the REST surface.
//!
//! Every operation receives the authenticated [`Caller`] and the current
//! instant explicitly; the owner's local "today" is derived from the stored
//! UTC offset inside the same transaction that reads or mutates the data.

pub mod accounts;
pub mod analytics;
pub mod boosts;
pub mod habits;
pub mod reflections;

use std::sync::Arc;

use becoming_store::{Database, StoreError, User};

use crate::auth::Caller;
use crate::error::ServerError;
use crate::habit_locks::HabitLocks;
use crate::store::Store;
use crate::summarizer::Summarizer;

#[derive(Clone)]
pub struct Engine {
    store: Store,
    locks: HabitLocks,
    summarizer: Arc<Summarizer>,
}

impl Engine {
    pub fn new(store: Store, summarizer: Arc<Summarizer>) -> Self {
        Self {
            store,
            locks: HabitLocks::new(),
            summarizer,
        }
    }

    pub fn habit_locks(&self) -> &HabitLocks {
        &self.locks
    }
}

/// The caller's account row. A valid token for an account that no longer
/// exists is treated as unauthenticated.
fn load_owner(db: &Database, caller: Caller) -> Result<User, ServerError> {
    db.get_user(caller.user_id).map_err(|e| match e {
        StoreError::NotFound => ServerError::Unauthorized("Account not found".into()),
        other => other.into(),
    })
}

/// Trimmed, non-empty, bounded free text.
fn required_text(field: &str, raw: &str, max_len: usize) -> Result<String, ServerError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ServerError::Validation(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(ServerError::Validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::ServerConfig;
    use chrono::{DateTime, TimeZone, Utc};

    pub struct Harness {
        pub engine: Engine,
        _dir: tempfile::TempDir,
    }

    pub fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("engine.db")).unwrap();
        let summarizer = Summarizer::from_config(&ServerConfig::default()).unwrap();
        Harness {
            engine: Engine::new(store, Arc::new(summarizer)),
            _dir: dir,
        }
    }

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    pub async fn register(engine: &Engine, email: &str) -> Caller {
        let user = engine
            .register(
                accounts::RegisterInput {
                    name: "Tester".into(),
                    email: email.into(),
                    password: "password123".into(),
                    utc_offset_minutes: None,
                },
                at(2024, 1, 1, 8),
            )
            .await
            .unwrap();
        Caller { user_id: user.id }
    }
}
