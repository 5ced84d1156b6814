use super::*;

fn file_input(url: &str, migrations_dir: &str) -> ConfigInput {
    ConfigInput {
        database: Some(DatabaseInput {
            url: Some(url.to_string()),
        }),
        directories: Some(DirectoriesInput {
            migrations_dir: Some(migrations_dir.to_string()),
            sequence_file: None,
        }),
        migration: None,
    }
}

#[test]
fn test_defaults_applied_when_input_empty() {
    let config = ConfigBuilder::new().resolve();
    assert_eq!(config.directories.migrations, "migrations");
    assert_eq!(config.directories.sequence_file, "migrations/sequence.list");
    assert_eq!(config.migration.tracking_table.schema, "public");
    assert_eq!(config.migration.tracking_table.name, "migrations");
    assert_eq!(config.migration.target_schema, "public");
}

#[test]
fn test_file_values_override_defaults() {
    let config = ConfigBuilder::new()
        .with_file(file_input("postgres://filehost/db", "db/migrations"))
        .resolve();

    assert_eq!(config.database.url.as_deref(), Some("postgres://filehost/db"));
    assert_eq!(config.directories.migrations, "db/migrations");
    // Unset field still defaulted
    assert_eq!(config.directories.sequence_file, "migrations/sequence.list");
}

#[test]
fn test_cli_args_override_file() {
    let cli_input = ConfigInput {
        database: Some(DatabaseInput {
            url: Some("postgres://clihost/db".to_string()),
        }),
        directories: None,
        migration: None,
    };

    let config = ConfigBuilder::new()
        .with_file(file_input("postgres://filehost/db", "db/migrations"))
        .with_cli_args(cli_input)
        .resolve();

    assert_eq!(config.database.url.as_deref(), Some("postgres://clihost/db"));
    // File directories survive an absent CLI section
    assert_eq!(config.directories.migrations, "db/migrations");
}

#[test]
fn test_partial_tracking_table_input() {
    let input = ConfigInput {
        database: None,
        directories: None,
        migration: Some(MigrationInput {
            tracking_table: Some(TrackingTableInput {
                schema: None,
                name: Some("schema_history".to_string()),
            }),
            target_schema: None,
        }),
    };

    let config = ConfigBuilder::new().with_file(input).resolve();
    assert_eq!(config.migration.tracking_table.schema, "public");
    assert_eq!(config.migration.tracking_table.name, "schema_history");
}

#[test]
fn test_require_url_error_mentions_all_sources() {
    let database = Database { url: None };
    let err = database.require_url().unwrap_err().to_string();
    assert!(err.contains("--database-url"));
    assert!(err.contains("DATABASE_URL"));
    assert!(err.contains("seqmig.yaml"));
}
