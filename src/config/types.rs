use clap::Args;
use serde::{Deserialize, Serialize};

/// Raw configuration input - all fields optional for merging
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ConfigInput {
    pub database: Option<DatabaseInput>,
    pub directories: Option<DirectoriesInput>,
    pub migration: Option<MigrationInput>,
}

/// Resolved configuration with all defaults applied
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database: Database,
    pub directories: Directories,
    pub migration: Migration,
}

// Database configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DatabaseInput {
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Database {
    pub url: Option<String>,
}

impl Database {
    /// The database URL, required by every command that talks to Postgres.
    pub fn require_url(&self) -> anyhow::Result<&str> {
        self.url.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "No database specified.\n\n\
                 Provide one of:\n\n\
                 • seqmig <command> --database-url postgres://host/db\n\
                 • export DATABASE_URL=postgres://host/db\n\
                 • Add 'database: {{ url: ... }}' to seqmig.yaml"
            )
        })
    }
}

// Directory configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DirectoriesInput {
    pub migrations_dir: Option<String>,
    pub sequence_file: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Directories {
    pub migrations: String,
    pub sequence_file: String,
}

// Migration configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MigrationInput {
    pub tracking_table: Option<TrackingTableInput>,
    pub target_schema: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TrackingTableInput {
    pub schema: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub tracking_table: TrackingTable,
    /// Schema probed for target-table existence
    pub target_schema: String,
}

#[derive(Debug, Clone)]
pub struct TrackingTable {
    pub schema: String,
    pub name: String,
}

// CLI argument groups for command-specific options
#[derive(Debug, Clone, Default, Args)]
pub struct DatabaseArgs {
    #[arg(long, help = "Database URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Clone, Default, Args)]
pub struct DirectoryArgs {
    #[arg(long, help = "Migrations directory path")]
    pub migrations_dir: Option<String>,

    #[arg(long, help = "Sequence file path")]
    pub sequence_file: Option<String>,
}

// Conversion functions from CLI args to config input
impl From<DatabaseArgs> for DatabaseInput {
    fn from(args: DatabaseArgs) -> Self {
        Self {
            url: args.database_url,
        }
    }
}

impl From<DirectoryArgs> for DirectoriesInput {
    fn from(args: DirectoryArgs) -> Self {
        Self {
            migrations_dir: args.migrations_dir,
            sequence_file: args.sequence_file,
        }
    }
}
