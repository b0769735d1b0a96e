//! Identity selections: each user's primary and optional secondary identity.

use rusqlite::{params, OptionalExtension};
use uuid::Uuid;

use crate::database::{fmt_timestamp, timestamp_at, uuid_at, Database};
use crate::error::{Result, StoreError};
use crate::models::IdentitySelection;

impl Database {
    /// Insert or replace a user's selection.
    pub fn upsert_identity_selection(&self, selection: &IdentitySelection) -> Result<()> {
        self.conn().execute(
            "INSERT INTO identity_selections (owner_id, primary_identity, secondary_identity, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(owner_id) DO UPDATE SET
                 primary_identity = excluded.primary_identity,
                 secondary_identity = excluded.secondary_identity,
                 updated_at = excluded.updated_at",
            params![
                selection.owner_id.to_string(),
                selection.primary_identity,
                selection.secondary_identity,
                fmt_timestamp(&selection.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_identity_selection(&self, owner_id: Uuid) -> Result<Option<IdentitySelection>> {
        self.conn()
            .query_row(
                "SELECT owner_id, primary_identity, secondary_identity, updated_at
                 FROM identity_selections WHERE owner_id = ?1",
                params![owner_id.to_string()],
                |row| {
                    Ok(IdentitySelection {
                        owner_id: uuid_at(row, 0)?,
                        primary_identity: row.get(1)?,
                        secondary_identity: row.get(2)?,
                        updated_at: timestamp_at(row, 3)?,
                    })
                },
            )
            .optional()
            .map_err(StoreError::Sqlite)
    }

    /// Users other than `exclude` whose primary or secondary identity is
    /// `tag`. Ordered by id so callers never depend on storage order.
    pub fn identity_holders(&self, tag: &str, exclude: Uuid) -> Result<Vec<Uuid>> {
        let mut stmt = self.conn().prepare(
            "SELECT owner_id FROM identity_selections
             WHERE (primary_identity = ?1 OR secondary_identity = ?1)
               AND owner_id <> ?2
             ORDER BY owner_id ASC",
        )?;
        let rows = stmt.query_map(params![tag, exclude.to_string()], |row| uuid_at(row, 0))?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_support::*;

    fn select(db: &Database, owner: Uuid, primary: &str, secondary: Option<&str>) {
        db.upsert_identity_selection(&IdentitySelection {
            owner_id: owner,
            primary_identity: primary.into(),
            secondary_identity: secondary.map(String::from),
            updated_at: ts(2024, 1, 1, 10),
        })
        .unwrap();
    }

    #[test]
    fn test_upsert_replaces_previous_selection() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        assert!(db.get_identity_selection(alice.id).unwrap().is_none());

        select(&db, alice.id, "learner", Some("healthy"));
        select(&db, alice.id, "mindful", None);

        let sel = db.get_identity_selection(alice.id).unwrap().unwrap();
        assert_eq!(sel.primary_identity, "mindful");
        assert_eq!(sel.secondary_identity, None);
    }

    #[test]
    fn test_holders_match_either_slot_and_exclude_sender() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let bob = user(&db, "bob@example.com");
        let carol = user(&db, "carol@example.com");
        select(&db, alice.id, "learner", None);
        select(&db, bob.id, "healthy", Some("learner"));
        select(&db, carol.id, "creative", None);

        let holders = db.identity_holders("learner", alice.id).unwrap();
        assert_eq!(holders, vec![bob.id]);
        assert!(db.identity_holders("creative", carol.id).unwrap().is_empty());
    }

    #[test]
    fn test_secondary_equal_to_primary_is_rejected_by_schema() {
        let (db, _dir) = temp_db();
        let alice = user(&db, "alice@example.com");
        let result = db.upsert_identity_selection(&IdentitySelection {
            owner_id: alice.id,
            primary_identity: "learner".into(),
            secondary_identity: Some("learner".into()),
            updated_at: ts(2024, 1, 1, 10),
        });
        assert!(result.is_err());
    }
}
