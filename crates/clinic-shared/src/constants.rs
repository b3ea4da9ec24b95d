//! Application-wide constants

/// Length of one billing term.
pub const BILLING_TERM_DAYS: i64 = 30;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 7 * 24 * 60 * 60;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 128;
pub const TEMPORARY_PASSWORD_LENGTH: usize = 16;
pub const MEMORY_DATABASE_URL: &str = "memory://";
pub const SUBSCRIPTION_INACTIVE_ERROR: &str = "subscription_inactive";
pub const SESSION_COOKIE_NAME: &str = "session_token";
