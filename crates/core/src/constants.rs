//! Constants used throughout the rxtrack core crate.
//!
//! Store keys keep the names the browser build used for its local storage entries, so a
//! data directory holds the same blobs under the same names.

/// Store key for the list of registered users.
pub const USERS_KEY: &str = "users";

/// Store key for the list of prescriptions.
pub const PRESCRIPTIONS_KEY: &str = "prescriptions";

/// Store key for the prescription id → reminder times map.
pub const REMINDER_TIMES_KEY: &str = "reminderTimes";

/// Store key for the signed-in user.
pub const CURRENT_USER_KEY: &str = "currentUser";

/// Default directory for the store when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "rx_data";

/// File extension used for store entries.
pub const STORE_FILE_EXTENSION: &str = "json";

/// Prefix of every prescription reference id.
pub const REFERENCE_ID_PREFIX: &str = "RX";

/// Attempts made to find an unused reference id before giving up.
pub const REFERENCE_ID_ATTEMPTS: usize = 5;

/// Highest daily dose count a prescription may carry.
pub const MAX_PRESCRIBED_FREQUENCY: u32 = 24;

/// Title shown on every medication reminder.
pub const REMINDER_TITLE: &str = "Medication Reminder";
