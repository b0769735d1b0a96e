/// Every HTTP route is mounted under this prefix
pub const API_PREFIX: &str = "/api";

/// Default HTTP API port (the web client expects 5000)
pub const DEFAULT_HTTP_PORT: u16 = 5000;

/// Number of days in the rolling window used for the weekly completion figure
pub const WEEKLY_WINDOW_DAYS: u32 = 7;

/// Default session lifetime in hours (one week)
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 24 * 7;

/// Minimum accepted password length
pub const MIN_PASSWORD_LEN: usize = 8;

/// Maximum habit name length in characters
pub const MAX_HABIT_NAME_LEN: usize = 120;

/// Maximum identity tag length in characters
pub const MAX_IDENTITY_LEN: usize = 64;

/// Maximum reflection length in characters
pub const MAX_REFLECTION_LEN: usize = 10_000;

/// Largest accepted UTC offset, in minutes, either side of UTC
pub const MAX_UTC_OFFSET_MINUTES: i32 = 14 * 60;

/// Default reminder time for new habits
pub const DEFAULT_REMINDER_TIME: &str = "09:00";

/// How far before a habit's creation day a completion may be back-filled
pub const MAX_BACKFILL_DAYS: i64 = 365;

/// Maximum number of received boosts returned to a recipient
pub const MAX_BOOSTS_LISTED: u32 = 100;

/// Ed25519 secret key size in bytes
pub const SECRET_KEY_SIZE: usize = 32;
