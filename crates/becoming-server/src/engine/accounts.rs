//! Registration, login, profile and identity selection.

use becoming_shared::clock::is_valid_offset;
use becoming_shared::constants::{MAX_HABIT_NAME_LEN, MIN_PASSWORD_LEN};
use becoming_shared::identity::normalize_tag;
use becoming_shared::StreakState;
use becoming_store::{IdentitySelection, User};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{habits::load_histories, load_owner, required_text, Engine};
use crate::auth::{self, Caller};
use crate::error::ServerError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterInput {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub utc_offset_minutes: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectIdentity {
    pub primary_identity: String,
    #[serde(default)]
    pub secondary_identity: Option<String>,
}

/// `GET /auth/me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub identity: Option<IdentitySelection>,
    pub habit_count: u64,
    pub current_streak: u32,
    pub longest_streak: u32,
    pub boosts_received: u64,
}

fn validate_email(raw: &str) -> Result<String, ServerError> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServerError::Validation("A valid email is required".into()));
    }
    Ok(email)
}

fn validate_offset(minutes: Option<i32>) -> Result<Option<i32>, ServerError> {
    match minutes {
        Some(m) if !is_valid_offset(m) => Err(ServerError::Validation(
            "utcOffsetMinutes must be within ±14 hours".into(),
        )),
        other => Ok(other),
    }
}

async fn hash_off_thread(password: String) -> Result<String, ServerError> {
    tokio::task::spawn_blocking(move || auth::hash_password(&password))
        .await
        .map_err(|e| ServerError::Internal(format!("hash task failed: {e}")))?
}

impl Engine {
    pub async fn register(
        &self,
        input: RegisterInput,
        now: DateTime<Utc>,
    ) -> Result<User, ServerError> {
        let name = required_text("name", &input.name, MAX_HABIT_NAME_LEN)?;
        let email = validate_email(&input.email)?;
        if input.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ServerError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let utc_offset_minutes = validate_offset(input.utc_offset_minutes)?;

        let password_hash = hash_off_thread(input.password).await?;
        let user = User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            utc_offset_minutes,
            created_at: now,
        };

        let created = user.clone();
        self.store
            .write(move |db| {
                db.create_user(&created).map_err(|e| match e {
                    becoming_store::StoreError::Conflict(_) => {
                        ServerError::Conflict("Email is already registered".into())
                    }
                    other => other.into(),
                })
            })
            .await?;

        info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Returns the user when the credentials match. Unknown email and wrong
    /// password are indistinguishable to the client.
    pub async fn login(&self, input: LoginInput) -> Result<User, ServerError> {
        let rejected = || ServerError::Unauthorized("Invalid email or password".into());

        let email = input.email.clone();
        let user = self
            .store
            .read(move |db| Ok(db.find_user_by_email(&email)?))
            .await?
            .ok_or_else(rejected)?;

        let hash = user.password_hash.clone();
        let password = input.password;
        let matches = tokio::task::spawn_blocking(move || auth::verify_password(&password, &hash))
            .await
            .map_err(|e| ServerError::Internal(format!("verify task failed: {e}")))??;

        if !matches {
            return Err(rejected());
        }
        Ok(user)
    }

    pub async fn profile(&self, caller: Caller, now: DateTime<Utc>) -> Result<ProfileView, ServerError> {
        self.store
            .read(move |db| {
                let user = load_owner(db, caller)?;
                let today = user.clock().today(now);
                let histories = load_histories(db, &user)?;
                let streaks = StreakState::rollup(histories.iter().map(|(_, h)| h.streak(today)));
                Ok(ProfileView {
                    identity: db.get_identity_selection(user.id)?,
                    habit_count: histories.len() as u64,
                    current_streak: streaks.current_streak,
                    longest_streak: streaks.longest_streak,
                    boosts_received: db.count_boosts_received(user.id)?,
                    user,
                })
            })
            .await
    }

    pub async fn update_profile(&self, caller: Caller, update: ProfileUpdate) -> Result<User, ServerError> {
        let name = update
            .name
            .as_deref()
            .map(|n| required_text("name", n, MAX_HABIT_NAME_LEN))
            .transpose()?;
        let offset = validate_offset(update.utc_offset_minutes)?;

        self.store
            .write(move |db| {
                let mut user = load_owner(db, caller)?;
                if let Some(name) = name {
                    user.name = name;
                }
                if offset.is_some() {
                    user.utc_offset_minutes = offset;
                }
                db.update_user_profile(&user)?;
                Ok(user)
            })
            .await
    }

    pub async fn select_identity(
        &self,
        caller: Caller,
        input: SelectIdentity,
        now: DateTime<Utc>,
    ) -> Result<IdentitySelection, ServerError> {
        let primary = normalize_tag(&input.primary_identity)
            .ok_or_else(|| ServerError::Validation("primaryIdentity is required".into()))?;
        let secondary = match input.secondary_identity.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(raw) => Some(
                normalize_tag(raw)
                    .ok_or_else(|| ServerError::Validation("secondaryIdentity is invalid".into()))?,
            ),
        };
        if secondary.as_deref() == Some(primary.as_str()) {
            return Err(ServerError::Validation(
                "Secondary identity must differ from the primary identity".into(),
            ));
        }

        self.store
            .write(move |db| {
                let owner = load_owner(db, caller)?;
                let selection = IdentitySelection {
                    owner_id: owner.id,
                    primary_identity: primary,
                    secondary_identity: secondary,
                    updated_at: now,
                };
                db.upsert_identity_selection(&selection)?;
                Ok(selection)
            })
            .await
    }

    pub async fn identity_selection(&self, caller: Caller) -> Result<IdentitySelection, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                db.get_identity_selection(owner.id)?
                    .ok_or_else(|| ServerError::NotFound("No identity selected yet".into()))
            })
            .await
    }
}
