// src/config/consts.rs

// Browser attach point
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9222;

// Navigation
pub const NAV_TIMEOUT_SECS: u64 = 20;
pub const POLL_INTERVAL_MS: u64 = 250;
pub const RETRIES: u32 = 2; // extra attempts after a transient failure
pub const COMMAND_TIMEOUT_SECS: u64 = 30; // one CDP round trip
pub const DISCOVERY_TIMEOUT_SECS: u64 = 5; // /json/version + /json/list

// Export
pub const DEFAULT_OUT_DIR: &str = ".";
pub const PER_ACTIVITY_PREFIX: &str = "garmin_workout_";
pub const SETS_SUFFIX: &str = "_sets";
pub const COMBINED_STEM: &str = "garmin_workouts_combined";
pub const SETS_COMBINED_STEM: &str = "garmin_workout_sets_combined";
pub const FAILURES_STEM: &str = "garmin_failures";
pub const PAGE_DUMP_PREFIX: &str = "garmin_page_"; // + id + ".html"
