//! # becoming-shared
//!
//! Domain logic shared by the store and the server: the weekly schedule
//! evaluator, owner-local clock, streak calculator, analytics aggregator,
//! identity catalog, and signed session tokens.
//!
//! Everything in this crate is pure computation over values handed in by the
//! caller. Nothing here touches the database or the network.

pub mod analytics;
pub mod clock;
pub mod constants;
pub mod error;
pub mod identity;
pub mod schedule;
pub mod session;
pub mod streak;
pub mod types;

pub use clock::OwnerClock;
pub use schedule::WeeklySchedule;
pub use streak::StreakState;
