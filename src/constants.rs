/// Default directory containing migration artifacts
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";

/// Default sequence file holding the ordered migration list
pub const DEFAULT_SEQUENCE_FILE: &str = "migrations/sequence.list";

/// Default schema for the ledger tracking table
pub const DEFAULT_TRACKING_SCHEMA: &str = "public";

/// Default name for the ledger tracking table
pub const DEFAULT_TRACKING_TABLE: &str = "migrations";

/// Schema searched by the table-existence inspector
pub const DEFAULT_TARGET_SCHEMA: &str = "public";
