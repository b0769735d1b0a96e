//! Anonymous boosts routed by identity tag.
//!
//! A boost goes to one other user whose current primary or secondary
//! identity matches the tag, chosen uniformly at random. Neither side learns
//! who the other is.

use becoming_shared::clock::time_ago;
use becoming_shared::constants::MAX_BOOSTS_LISTED;
use becoming_shared::identity::normalize_tag;
use becoming_store::Boost;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{load_owner, Engine};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendBoost {
    pub identity_id: String,
}

/// What the sender sees. The recipient is deliberately absent.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentBoost {
    pub id: Uuid,
    pub identity: String,
    pub sent_at: DateTime<Utc>,
}

/// What the recipient sees. Carries no sender information.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedBoost {
    pub id: Uuid,
    pub identity: String,
    pub sent_at: DateTime<Utc>,
    pub time_ago: String,
}

/// Uniform choice among eligible recipients.
pub fn pick_recipient<R: Rng + ?Sized>(candidates: &[Uuid], rng: &mut R) -> Option<Uuid> {
    candidates.choose(rng).copied()
}

impl Engine {
    pub async fn send_boost(
        &self,
        caller: Caller,
        input: SendBoost,
        now: DateTime<Utc>,
    ) -> Result<SentBoost, ServerError> {
        let tag = normalize_tag(&input.identity_id)
            .ok_or_else(|| ServerError::Validation("identityId is required".into()))?;

        self.store
            .write(move |db| {
                let sender = load_owner(db, caller)?;
                let candidates = db.identity_holders(&tag, sender.id)?;
                let recipient = pick_recipient(&candidates, &mut rand::thread_rng())
                    .ok_or_else(|| ServerError::NoEligibleRecipient(tag.clone()))?;

                let boost = Boost {
                    id: Uuid::new_v4(),
                    from_owner_id: sender.id,
                    to_owner_id: recipient,
                    identity_tag: tag,
                    sent_at: now,
                };
                db.insert_boost(&boost)?;
                info!(boost_id = %boost.id, identity = %boost.identity_tag, "Boost sent");

                Ok(SentBoost {
                    id: boost.id,
                    identity: boost.identity_tag,
                    sent_at: boost.sent_at,
                })
            })
            .await
    }

    /// Boosts the caller received, newest first.
    pub async fn received_boosts(
        &self,
        caller: Caller,
        now: DateTime<Utc>,
    ) -> Result<Vec<ReceivedBoost>, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                Ok(db
                    .list_boosts_received(owner.id, MAX_BOOSTS_LISTED)?
                    .into_iter()
                    .map(|b| ReceivedBoost {
                        time_ago: time_ago(b.sent_at, now),
                        id: b.id,
                        identity: b.identity_tag,
                        sent_at: b.sent_at,
                    })
                    .collect())
            })
            .await
    }
}
