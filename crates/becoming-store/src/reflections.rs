//! Journal entries.

use becoming_shared::types::Mood;
use rusqlite::params;
use uuid::Uuid;

use crate::database::{fmt_timestamp, timestamp_at, uuid_at, Database};
use crate::error::Result;
use crate::models::Reflection;

impl Database {
    pub fn insert_reflection(&self, reflection: &Reflection) -> Result<()> {
        self.conn().execute(
            "INSERT INTO reflections (id, owner_id, content, mood, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                reflection.id.to_string(),
                reflection.owner_id.to_string(),
                reflection.content,
                reflection.mood.map(|m| m.as_str()),
                fmt_timestamp(&reflection.created_at),
            ],
        )?;
        Ok(())
    }

    /// An owner's reflections, newest first.
    pub fn list_reflections(&self, owner_id: Uuid) -> Result<Vec<Reflection>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, owner_id, content, mood, created_at
             FROM reflections
             WHERE owner_id = ?1
             ORDER BY created_at DESC, id ASC",
        )?;
        let rows = stmt.query_map(params![owner_id.to_string()], |row| {
            let mood: Option<String> = row.get(3)?;
            // Unknown moods are dropped rather than failing the whole list.
            let mood = mood.and_then(|m| m.parse::<Mood>().ok());
            Ok(Reflection {
                id: uuid_at(row, 0)?,
                owner_id: uuid_at(row, 1)?,
                content: row.get(2)?,
                mood,
                created_at: timestamp_at(row, 4)?,
            })
        })?;

        let mut reflections = Vec::new();
        for row in rows {
            reflections.push(row?);
        }
        Ok(reflections)
    }

    pub fn count_reflections(&self, owner_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM reflections WHERE owner_id = ?1",
            params![owner_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::*;

    #[test]
    fn test_list_newest_first_with_mood() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let older = Reflection {
            id: Uuid::new_v4(),
            owner_id: alice.id,
            content: "Slow start".into(),
            mood: Some(Mood::Struggling),
            created_at: ts(2024, 1, 2, 21),
        };
        let newer = Reflection {
            id: Uuid::new_v4(),
            owner_id: alice.id,
            content: "Good day".into(),
            mood: None,
            created_at: ts(2024, 1, 3, 21),
        };
        db.insert_reflection(&older).unwrap();
        db.insert_reflection(&newer).unwrap();

        let listed = db.list_reflections(alice.id).unwrap();
        assert_eq!(listed, vec![newer, older]);
        assert_eq!(db.count_reflections(alice.id).unwrap(), 2);
    }

    #[test]
    fn test_reflections_are_private() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        db.insert_reflection(&Reflection {
            id: Uuid::new_v4(),
            owner_id: alice.id,
            content: "Mine".into(),
            mood: Some(Mood::Great),
            created_at: ts(2024, 1, 2, 21),
        })
        .unwrap();
        assert!(db.list_reflections(bob.id).unwrap().is_empty());
    }
}
