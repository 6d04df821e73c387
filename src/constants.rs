//! Table and column names shared by every tool. The schema itself is owned
//! by the application's ORM; these tools only touch rows.

pub const MEMBER_TABLE: &str = "Member";
pub const MEMBER_COUNTER_TABLE: &str = "MemberCounter";
pub const RECEIPT_TABLE: &str = "Receipt";
pub const INVITATION_TABLE: &str = "Invitation";

// Columns that hold free text and can be empty rather than NULL
pub const TEXT_COLUMNS: [&str; 5] = ["id", "name", "phone", "notes", "profileImage"];

// Numeric/boolean columns reset to zero when NULL
pub const ZERO_DEFAULT_COLUMNS: [(&str, &str); 6] = [
    ("inBodyScans", "0"),
    ("invitations", "0"),
    ("freePTSessions", "0"),
    ("subscriptionPrice", "0.0"),
    ("remainingAmount", "0.0"),
    ("isActive", "0"),
];

pub const MIN_ID_LEN: usize = 10;
pub const MAX_ID_LEN: usize = 30;
pub const GENERATED_ID_LEN: usize = 25;

pub const PLACEHOLDER_PHONE: &str = "0100000000";
pub const MIN_PHONE_DIGITS: usize = 10;
pub const PLACEHOLDER_NAME_PREFIX: &str = "member_";

/// First membership number handed out when the counter row is missing.
pub const DEFAULT_FIRST_MEMBER_NUMBER: i64 = 1001;

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_ONLY_LEN: usize = 10;

pub const DEFAULT_DB_PATH: &str = "dev.db";
pub const DEFAULT_INPUT_PATH: &str = "members.xlsx";
pub const DEFAULT_CONFIG_PATH: &str = "gym_maint.toml";
pub const DEFAULT_LOG_DIR: &str = "logs";
