//! Anonymous boosts between users who share an identity.

use rusqlite::params;
use uuid::Uuid;

use crate::database::{fmt_timestamp, timestamp_at, uuid_at, Database};
use crate::error::Result;
use crate::models::Boost;

impl Database {
    pub fn insert_boost(&self, boost: &Boost) -> Result<()> {
        self.conn().execute(
            "INSERT INTO boosts (id, from_owner_id, to_owner_id, identity_tag, sent_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                boost.id.to_string(),
                boost.from_owner_id.to_string(),
                boost.to_owner_id.to_string(),
                boost.identity_tag,
                fmt_timestamp(&boost.sent_at),
            ],
        )?;
        Ok(())
    }

    /// Boosts received by `to_owner_id`, newest first, at most `limit`.
    pub fn list_boosts_received(&self, to_owner_id: Uuid, limit: u32) -> Result<Vec<Boost>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, from_owner_id, to_owner_id, identity_tag, sent_at
             FROM boosts
             WHERE to_owner_id = ?1
             ORDER BY sent_at DESC, id ASC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![to_owner_id.to_string(), limit], |row| {
            Ok(Boost {
                id: uuid_at(row, 0)?,
                from_owner_id: uuid_at(row, 1)?,
                to_owner_id: uuid_at(row, 2)?,
                identity_tag: row.get(3)?,
                sent_at: timestamp_at(row, 4)?,
            })
        })?;

        let mut boosts = Vec::new();
        for row in rows {
            boosts.push(row?);
        }
        Ok(boosts)
    }

    pub fn count_boosts_received(&self, to_owner_id: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM boosts WHERE to_owner_id = ?1",
            params![to_owner_id.to_string()],
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
    fn test_received_boosts_are_newest_first_and_limited() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        for hour in [9, 11, 10] {
            db.insert_boost(&Boost {
                id: Uuid::new_v4(),
                from_owner_id: alice.id,
                to_owner_id: bob.id,
                identity_tag: "learner".into(),
                sent_at: ts(2024, 1, 2, hour),
            })
            .unwrap();
        }

        let listed = db.list_boosts_received(bob.id, 2).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].sent_at, ts(2024, 1, 2, 11));
        assert_eq!(listed[1].sent_at, ts(2024, 1, 2, 10));
        assert_eq!(db.count_boosts_received(bob.id).unwrap(), 3);
        assert_eq!(db.count_boosts_received(alice.id).unwrap(), 0);
    }

    #[test]
    fn test_sender_is_not_serialized() {
        let boost = Boost {
            id: Uuid::new_v4(),
            from_owner_id: Uuid::new_v4(),
            to_owner_id: Uuid::new_v4(),
            identity_tag: "mindful".into(),
            sent_at: ts(2024, 1, 2, 9),
        };
        let json = serde_json::to_value(&boost).unwrap();
        assert!(json.get("fromOwnerId").is_none());
        assert_eq!(json["identityTag"], "mindful");
    }
}
