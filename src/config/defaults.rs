use crate::config::types::*;
use crate::constants::{
    DEFAULT_MIGRATIONS_DIR, DEFAULT_SEQUENCE_FILE, DEFAULT_TARGET_SCHEMA, DEFAULT_TRACKING_SCHEMA,
    DEFAULT_TRACKING_TABLE,
};

impl Default for Directories {
    fn default() -> Self {
        Self {
            migrations: DEFAULT_MIGRATIONS_DIR.to_string(),
            sequence_file: DEFAULT_SEQUENCE_FILE.to_string(),
        }
    }
}

impl Default for Migration {
    fn default() -> Self {
        Self {
            tracking_table: TrackingTable::default(),
            target_schema: DEFAULT_TARGET_SCHEMA.to_string(),
        }
    }
}

impl Default for TrackingTable {
    fn default() -> Self {
        Self {
            schema: DEFAULT_TRACKING_SCHEMA.to_string(),
            name: DEFAULT_TRACKING_TABLE.to_string(),
        }
    }
}
