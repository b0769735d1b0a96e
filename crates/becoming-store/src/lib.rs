//! # becoming-store
//!
//! SQLite persistence for the habit engine.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Schema migrations run once when the database is first opened with
//! [`Database::open_at`]; request-scoped handles use [`Database::connect`].

pub mod boosts;
pub mod completions;
pub mod database;
pub mod habits;
pub mod identities;
pub mod migrations;
pub mod models;
pub mod reflections;
pub mod users;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
