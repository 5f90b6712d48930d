//! Centralized keys, timings and prices for Choice Type.
//!
//! Persisted key spellings live here so every component reads and writes the
//! same ledger fields. Changing a key orphans data on existing installs.

use std::time::Duration;

// Ledger keys --------------------------------------------------------------
pub const KEY_CLASSIFICATION: &str = "@choice_type";
pub const KEY_LAST_SCORE: &str = "@last_balls";
pub const KEY_MAX_BALLS: &str = "@max_balls";
pub const KEY_UNLOCKED: &str = "@unlocked_walls";

/// Read aliases for the balance, probed in order; the first present value wins.
pub const MAX_BALLS_ALIASES: [&str; 5] = [
    KEY_MAX_BALLS,
    "@maxBalls",
    "max_balls",
    "MAX_BALLS",
    "maxBalls",
];

// Quiz timing ----------------------------------------------------------------
pub const QUESTION_SECS: u32 = 10;
pub const SETTLE_MS: u64 = 320;
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

// Activity timer -----------------------------------------------------------
pub const ACTIVITY_DURATION_SECS: u32 = 3 * 60 * 60;
pub const ACTIVITY_REWARD: u32 = 1;

// Wallpapers ---------------------------------------------------------------
pub const DEFAULT_ALBUM: &str = "RooBall";
pub const EXPORT_FAILURE_MESSAGE: &str = "Failed to save file.";
pub const INSUFFICIENT_FUNDS_MESSAGE: &str = "Not enough balls";
