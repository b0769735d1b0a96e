//! Domain model structs persisted in the SQLite database.
//!
//! Models serialize with camelCase field names so handlers can return them
//! to the web client directly. Secrets and sender identities are never
//! serialized.

use becoming_shared::types::{Difficulty, Mood, ReminderTime};
use becoming_shared::{OwnerClock, WeeklySchedule};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    /// Lower-cased; unique across users.
    pub email: String,
    /// Argon2id PHC string.
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    /// The owner's timezone as a fixed offset. `None` means UTC.
    pub utc_offset_minutes: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn clock(&self) -> OwnerClock {
        OwnerClock::from_offset_minutes(self.utc_offset_minutes)
    }
}

// ---------------------------------------------------------------------------
// Habit
// ---------------------------------------------------------------------------

/// A recurring habit attached to one of the owner's identities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    /// Free-text identity tag, e.g. "Learner".
    pub identity: String,
    pub difficulty: Difficulty,
    pub reminder_time: ReminderTime,
    pub weekly_schedule: WeeklySchedule,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Completion ledger
// ---------------------------------------------------------------------------

/// The fact that a habit was completed on one owner-local day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CompletionEvent {
    pub habit_id: Uuid,
    pub date: NaiveDate,
    pub completed_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Identity selection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySelection {
    #[serde(skip_serializing, default = "Uuid::nil")]
    pub owner_id: Uuid,
    pub primary_identity: String,
    pub secondary_identity: Option<String>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Boost
// ---------------------------------------------------------------------------

/// An anonymous motivational signal. `from_owner_id` exists only so the
/// server can account for it; it is never serialized.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Boost {
    pub id: Uuid,
    #[serde(skip_serializing, default = "Uuid::nil")]
    pub from_owner_id: Uuid,
    pub to_owner_id: Uuid,
    pub identity_tag: String,
    pub sent_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Reflection
// ---------------------------------------------------------------------------

/// A free-text journal entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reflection {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub content: String,
    pub mood: Option<Mood>,
    pub created_at: DateTime<Utc>,
}
