use becoming_shared::constants::MAX_REFLECTION_LEN;
use becoming_shared::types::Mood;
use becoming_store::Reflection;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::{load_owner, required_text, Engine};
use crate::auth::Caller;
use crate::error::ServerError;

#[derive(Debug, Clone, Deserialize)]
pub struct NewReflection {
    pub content: String,
    #[serde(default)]
    pub mood: Option<Mood>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReflectionSummary {
    pub summary: Option<String>,
    pub available: bool,
}

impl ReflectionSummary {
    fn unavailable() -> Self {
        Self {
            summary: None,
            available: false,
        }
    }
}

impl Engine {
    pub async fn add_reflection(
        &self,
        caller: Caller,
        input: NewReflection,
        now: DateTime<Utc>,
    ) -> Result<Reflection, ServerError> {
        let content = required_text("content", &input.content, MAX_REFLECTION_LEN)?;
        self.store
            .write(move |db| {
                let owner = load_owner(db, caller)?;
                let reflection = Reflection {
                    id: Uuid::new_v4(),
                    owner_id: owner.id,
                    content,
                    mood: input.mood,
                    created_at: now,
                };
                db.insert_reflection(&reflection)?;
                Ok(reflection)
            })
            .await
    }

    pub async fn reflections(&self, caller: Caller) -> Result<Vec<Reflection>, ServerError> {
        self.store
            .read(move |db| {
                let owner = load_owner(db, caller)?;
                Ok(db.list_reflections(owner.id)?)
            })
            .await
    }

    /// Summarize the caller's journal, oldest entry first. Summarizer
    /// failures degrade to an unavailable summary.
    pub async fn reflection_summary(&self, caller: Caller) -> Result<ReflectionSummary, ServerError> {
        let mut entries = self.reflections(caller).await?;
        if entries.is_empty() || !self.summarizer.is_enabled() {
            return Ok(ReflectionSummary::unavailable());
        }
        entries.reverse();
        let text = entries
            .iter()
            .map(|r| r.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        match self.summarizer.summarize(&text).await {
            Ok(summary) => Ok(ReflectionSummary {
                summary: Some(summary),
                available: true,
            }),
            Err(e) => {
                warn!(error = %e, "Reflection summary unavailable");
                Ok(ReflectionSummary::unavailable())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::*;

    #[tokio::test]
    async fn test_entries_are_private_and_newest_first() {
        let h = harness();
        let alice = register(&h.engine, "alice@example.com").await;
        let bob = register(&h.engine, "bob@example.com").await;

        for (hour, text) in [(20, "first"), (21, "second")] {
            h.engine
                .add_reflection(
                    alice,
                    NewReflection {
                        content: text.into(),
                        mood: Some(Mood::Okay),
                    },
                    at(2024, 1, 2, hour),
                )
                .await
                .unwrap();
        }

        let listed = h.engine.reflections(alice).await.unwrap();
        assert_eq!(listed[0].content, "second");
        assert_eq!(listed[1].content, "first");
        assert!(h.engine.reflections(bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let h = harness();
        let alice = register(&h.engine, "alice@example.com").await;
        let result = h
            .engine
            .add_reflection(
                alice,
                NewReflection {
                    content: "  ".into(),
                    mood: None,
                },
                at(2024, 1, 2, 9),
            )
            .await;
        assert!(matches!(result, Err(ServerError::Validation(_))));
    }

    #[tokio::test]
    async fn test_summary_degrades_without_summarizer() {
        let h = harness();
        let alice = register(&h.engine, "alice@example.com").await;
        h.engine
            .add_reflection(
                alice,
                NewReflection {
                    content: "A good week".into(),
                    mood: Some(Mood::Great),
                },
                at(2024, 1, 2, 9),
            )
            .await
            .unwrap();

        let summary = h.engine.reflection_summary(alice).await.unwrap();
        assert_eq!(summary, ReflectionSummary::unavailable());
    }
}
