//! Habit CRUD and the completion ledger.
//!
//! Mutations of a single habit hold its in-process lock for the duration of
//! an immediate write transaction. Views are annotated with today's due and
//! completion state and the habit's streaks, recomputed from the ledger.

use std::collections::HashMap;

use becoming_shared::analytics::HabitHistory;
use becoming_shared::constants::{
    DEFAULT_REMINDER_TIME, MAX_BACKFILL_DAYS, MAX_HABIT_NAME_LEN, MAX_IDENTITY_LEN,
};
use becoming_shared::types::{Difficulty, ReminderTime};
use becoming_shared::{OwnerClock, WeeklySchedule};
use becoming_store::{CompletionEvent, Database, Habit, StoreError, User};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::{load_owner, required_text, Engine};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHabit {
    pub name: String,
    pub identity: String,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub reminder_time: Option<ReminderTime>,
    #[serde(default)]
    pub weekly_schedule: Option<WeeklySchedule>,
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitPatch {
    pub name: Option<String>,
    pub identity: Option<String>,
    pub difficulty: Option<Difficulty>,
    pub reminder_time: Option<ReminderTime>,
    pub weekly_schedule: Option<WeeklySchedule>,
}

/// Optional body of complete/uncomplete.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct DayInput {
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HabitView {
    #[serde(flatten)]
    pub habit: Habit,
    pub due_today: bool,
    pub completed_today: bool,
    pub streak: u32,
    pub longest_streak: u32,
}

impl HabitView {
    fn build(habit: Habit, history: &HabitHistory, today: NaiveDate) -> Self {
        let streak = history.streak(today);
        Self {
            due_today: habit.weekly_schedule.is_due(today),
            completed_today: history.completions.contains(&today),
            streak: streak.current_streak,
            longest_streak: streak.longest_streak,
            habit,
        }
    }
}

/// Result of a complete/uncomplete call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionOutcome {
    pub habit_id: Uuid,
    pub date: NaiveDate,
    pub completed: bool,
    /// Whether the ledger changed; `false` for a repeated call.
    pub changed: bool,
    pub streak: u32,
    pub longest_streak: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CompletionStatus {
    pub date: NaiveDate,
    pub completed: bool,
}

fn habit_not_found(e: StoreError) -> ServerError {
    match e {
        StoreError::NotFound => ServerError::NotFound("Habit not found".into()),
        other => other.into(),
    }
}

fn history_of(habit: &Habit, events: &[CompletionEvent], clock: &OwnerClock) -> HabitHistory {
    HabitHistory::from_events(
        habit.weekly_schedule,
        habit.created_at,
        events.iter().map(|e| (e.date, e.completed_at)),
        clock,
    )
}

/// Every habit of `owner` with its history, oldest habit first.
pub(super) fn load_histories(
    db: &Database,
    owner: &User,
) -> Result<Vec<(Habit, HabitHistory)>, ServerError> {
    let clock = owner.clock();
    let mut by_habit: HashMap<Uuid, Vec<CompletionEvent>> = HashMap::new();
    for event in db.completions_for_owner(owner.id)? {
        by_habit.entry(event.habit_id).or_default().push(event);
    }

    let habits = db.list_habits_for_owner(owner.id)?;
    Ok(habits
        .into_iter()
        .map(|habit| {
            let events = by_habit.remove(&habit.id).unwrap_or_default();
            let history = history_of(&habit, &events, &clock);
            (habit, history)
        })
        .collect())
}

fn load_view(
    db: &Database,
    owner: &User,
    habit: Habit,
    now: DateTime<Utc>,
) -> Result<HabitView, ServerError> {
    let clock = owner.clock();
    let events = db.completions_for_habit(habit.id)?;
    let history = history_of(&habit, &events, &clock);
    Ok(HabitView::build(habit, &history, clock.today(now)))
}

/// Default to the owner's today. Days that have not started yet, or that lie
/// more than [`MAX_BACKFILL_DAYS`] before the habit's creation day, are
/// rejected.
fn resolve_day(
    requested: Option<NaiveDate>,
    today: NaiveDate,
    created_on: NaiveDate,
) -> Result<NaiveDate, ServerError> {
    let Some(day) = requested else {
        return Ok(today);
    };
    if day > today {
        return Err(ServerError::Validation(
            "Cannot record a completion for a future date".into(),
        ));
    }
    let earliest = created_on
        .checked_sub_signed(Duration::days(MAX_BACKFILL_DAYS))
        .unwrap_or(NaiveDate::MIN);
    if day < earliest {
        return Err(ServerError::Validation(format!(
            "Cannot record a completion before {earliest}"
        )));
    }
    Ok(day)
}

impl Engine {
    pub async fn create_habit(
        &self,
        caller: Caller,
        input: NewHabit,
        now: DateTime<Utc>,
    ) -> Result<HabitView, ServerError> {
        let name = required_text("name", &input.name, MAX_HABIT_NAME_LEN)?;
        let identity = required_text("identity", &input.identity, MAX_IDENTITY_LEN)?;
        let reminder_time = match input.reminder_time {
            Some(t) => t,
            None => DEFAULT_REMINDER_TIME
                .parse()
                .map_err(|e| ServerError::Internal(format!("default reminder time: {e}")))?,
        };

        self.store
            .write(move |db| {
                let owner = load_owner(db, caller)?;
                let habit = Habit {
                    id: Uuid::new_v4(),
                    owner_id: owner.id,
                    name,
                    identity,
                    difficulty: input.difficulty.unwrap_or_default(),
                    reminder_time,
                    weekly_schedule: input.weekly_schedule.unwrap_or_default(),
                    created_at: now,
                };
                db.create_habit(&habit)?;
                info!(habit_id = %habit.id, owner_id = %owner.id, "Habit created");
                load_view(db, &owner, habit, now)
            })
            .await
    }

    pub async fn list_habits(&self, caller: Caller, now: DateTime<Utc>) -> Result<Vec<HabitView>, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                let today = owner.clock().today(now);
                Ok(load_histories(db, &owner)?
                    .into_iter()
                    .map(|(habit, history)| HabitView::build(habit, &history, today))
                    .collect())
            })
            .await
    }

    pub async fn get_habit(
        &self,
        caller: Caller,
        habit_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<HabitView, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                let habit = db.get_habit_for_owner(habit_id, owner.id).map_err(habit_not_found)?;
                load_view(db, &owner, habit, now)
            })
            .await
    }

    pub async fn update_habit(
        &self,
        caller: Caller,
        habit_id: Uuid,
        patch: HabitPatch,
        now: DateTime<Utc>,
    ) -> Result<HabitView, ServerError> {
        let name = patch
            .name
            .as_deref()
            .map(|n| required_text("name", n, MAX_HABIT_NAME_LEN))
            .transpose()?;
        let identity = patch
            .identity
            .as_deref()
            .map(|i| required_text("identity", i, MAX_IDENTITY_LEN))
            .transpose()?;

        let _guard = self.locks.acquire(habit_id).await;
        self.store
            .write(move |db| {
                let owner = load_owner(db, caller)?;
                let mut habit = db.get_habit_for_owner(habit_id, owner.id).map_err(habit_not_found)?;
                if let Some(name) = name {
                    habit.name = name;
                }
                if let Some(identity) = identity {
                    habit.identity = identity;
                }
                if let Some(difficulty) = patch.difficulty {
                    habit.difficulty = difficulty;
                }
                if let Some(reminder_time) = patch.reminder_time {
                    habit.reminder_time = reminder_time;
                }
                if let Some(schedule) = patch.weekly_schedule {
                    habit.weekly_schedule = schedule;
                }
                db.update_habit(&habit).map_err(habit_not_found)?;
                debug!(habit_id = %habit.id, "Habit updated");
                load_view(db, &owner, habit, now)
            })
            .await
    }

    pub async fn delete_habit(&self, caller: Caller, habit_id: Uuid) -> Result<(), ServerError> {
        let _guard = self.locks.acquire(habit_id).await;
        self.store
            .write(move |db| {
                let owner = load_owner(db, caller)?;
                if !db.delete_habit_for_owner(habit_id, owner.id)? {
                    return Err(ServerError::NotFound("Habit not found".into()));
                }
                info!(habit_id = %habit_id, "Habit deleted");
                Ok(())
            })
            .await
    }

    /// Mark a day complete. Repeating the call is a successful no-op.
    pub async fn complete(
        &self,
        caller: Caller,
        habit_id: Uuid,
        input: DayInput,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, ServerError> {
        self.set_completion(caller, habit_id, input.date, true, now).await
    }

    /// Clear a day's completion. Clearing an incomplete day is a successful
    /// no-op.
    pub async fn uncomplete(
        &self,
        caller: Caller,
        habit_id: Uuid,
        input: DayInput,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, ServerError> {
        self.set_completion(caller, habit_id, input.date, false, now).await
    }

    async fn set_completion(
        &self,
        caller: Caller,
        habit_id: Uuid,
        date: Option<NaiveDate>,
        completed: bool,
        now: DateTime<Utc>,
    ) -> Result<CompletionOutcome, ServerError> {
        let _guard = self.locks.acquire(habit_id).await;
        self.store
            .write(move |db| {
                let owner = load_owner(db, caller)?;
                let clock = owner.clock();
                let today = clock.today(now);
                let habit = db.get_habit_for_owner(habit_id, owner.id).map_err(habit_not_found)?;
                let day = resolve_day(date, today, clock.local_date(habit.created_at))?;

                let changed = if completed {
                    db.insert_completion(&CompletionEvent {
                        habit_id,
                        date: day,
                        completed_at: now,
                    })?
                } else {
                    db.delete_completion(habit_id, day)?
                };

                let events = db.completions_for_habit(habit_id)?;
                let streak = history_of(&habit, &events, &clock).streak(today);
                debug!(habit_id = %habit_id, date = %day, completed, changed, "Completion recorded");

                Ok(CompletionOutcome {
                    habit_id,
                    date: day,
                    completed,
                    changed,
                    streak: streak.current_streak,
                    longest_streak: streak.longest_streak,
                })
            })
            .await
    }

    pub async fn is_completed(
        &self,
        caller: Caller,
        habit_id: Uuid,
        date: NaiveDate,
    ) -> Result<CompletionStatus, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                db.get_habit_for_owner(habit_id, owner.id).map_err(habit_not_found)?;
                Ok(CompletionStatus {
                    date,
                    completed: db.is_completed(habit_id, date)?,
                })
            })
            .await
    }

    /// The habit's ledger, oldest first.
    pub async fn habit_history(
        &self,
        caller: Caller,
        habit_id: Uuid,
    ) -> Result<Vec<CompletionEvent>, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                db.get_habit_for_owner(habit_id, owner.id).map_err(habit_not_found)?;
                Ok(db.completions_for_habit(habit_id)?)
            })
            .await
    }
}
