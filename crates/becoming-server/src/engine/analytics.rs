use becoming_shared::analytics::{self, AnalyticsReport, DayReport, HabitHistory};
use becoming_shared::constants::WEEKLY_WINDOW_DAYS;
use becoming_shared::StreakState;
use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{habits::load_histories, load_owner, Engine};
use crate::auth::Caller;
use crate::error::ServerError;

/// `GET /report/overview`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub habit_count: u64,
    pub due_today: u64,
    pub completed_today: u64,
    pub total_completed: u64,
    pub boosts_received: u64,
    pub reflection_count: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
}

impl Engine {
    pub async fn analytics(&self, caller: Caller, now: DateTime<Utc>) -> Result<AnalyticsReport, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                let histories: Vec<HabitHistory> =
                    load_histories(db, &owner)?.into_iter().map(|(_, h)| h).collect();
                Ok(analytics::analyze(&histories, owner.clock().today(now)))
            })
            .await
    }

    /// Due/completed counts for each of the last seven owner-local days.
    pub async fn weekly_report(&self, caller: Caller, now: DateTime<Utc>) -> Result<Vec<DayReport>, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                let histories: Vec<HabitHistory> =
                    load_histories(db, &owner)?.into_iter().map(|(_, h)| h).collect();
                Ok(analytics::daily_breakdown(
                    &histories,
                    owner.clock().today(now),
                    WEEKLY_WINDOW_DAYS,
                ))
            })
            .await
    }

    pub async fn overview(&self, caller: Caller, now: DateTime<Utc>) -> Result<Overview, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                let today = owner.clock().today(now);
                let habits = load_histories(db, &owner)?;

                let mut overview = Overview {
                    habit_count: habits.len() as u64,
                    total_completed: db.count_completions_for_owner(owner.id)?,
                    boosts_received: db.count_boosts_received(owner.id)?,
                    reflection_count: db.count_reflections(owner.id)?,
                    ..Overview::default()
                };
                for (habit, history) in &habits {
                    if habit.weekly_schedule.is_due(today) {
                        overview.due_today += 1;
                    }
                    if history.completions.contains(&today) {
                        overview.completed_today += 1;
                    }
                }
                let streaks = StreakState::rollup(habits.iter().map(|(_, h)| h.streak(today)));
                overview.current_streak = streaks.current_streak;
                overview.longest_streak = streaks.longest_streak;
                Ok(overview)
            })
            .await
    }
}
