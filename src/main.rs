mod commands;
mod config;
mod constants;
mod db;
mod ledger;
mod probe;
mod report;
mod resolver;
mod runner;
mod sequence;
mod unit;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::ReportFormat;
use dotenv::dotenv;
use report::Direction;
use sequence::ListFilter;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[arg(long, default_value = "seqmig.yaml", global = true)]
    config_file: String,

    /// Enable verbose output (info level)
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Suppress all non-essential output (error level only)
    #[arg(long, short = 'q', global = true)]
    quiet: bool,

    /// Enable debug output (debug level)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Parser)]
struct UpArgs {
    /// Report output format
    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,

    #[command(flatten)]
    database_args: config::DatabaseArgs,

    #[command(flatten)]
    directory_args: config::DirectoryArgs,
}

#[derive(Parser)]
struct DownArgs {
    /// Revert without a confirmation prompt
    #[arg(long)]
    force: bool,

    /// Report output format
    #[arg(long, value_enum, default_value = "text")]
    format: ReportFormat,

    #[command(flatten)]
    database_args: config::DatabaseArgs,

    #[command(flatten)]
    directory_args: config::DirectoryArgs,
}

#[derive(Parser)]
struct ListArgs {
    /// Which migrations to include
    #[arg(long, value_enum, default_value = "all")]
    filter: ListFilter,

    /// Rewrite the sequence file instead of printing to stdout
    #[arg(long)]
    write: bool,

    #[command(flatten)]
    database_args: config::DatabaseArgs,

    #[command(flatten)]
    directory_args: config::DirectoryArgs,
}

#[derive(Parser)]
struct StatusArgs {
    #[command(flatten)]
    database_args: config::DatabaseArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the ordered migration list (forward pass)
    Up(UpArgs),

    /// Revert the ordered migration list in exact reverse (backward pass)
    Down(DownArgs),

    /// Print or regenerate the ordered migration list
    List(ListArgs),

    /// Show applied migrations grouped by batch
    Status(StatusArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    initialize_logging(&cli);
    run_main(cli).await
}

fn initialize_logging(cli: &Cli) {
    let level = if cli.debug {
        "debug"
    } else if cli.verbose {
        "info"
    } else if cli.quiet {
        "error"
    } else {
        "warn" // default level
    };

    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::new(level)
    };

    fmt().with_env_filter(filter).with_target(false).init();
}

async fn run_main(cli: Cli) -> Result<()> {
    let (file_config, _root_dir) = config::load_config(&cli.config_file)?;

    match &cli.command {
        Commands::Up(args) => {
            let config = resolve_config(
                &file_config,
                &args.database_args,
                Some(&args.directory_args),
            );

            info!("Running apply pass");
            commands::cmd_run(&config, Direction::Up, true, args.format).await
        }
        Commands::Down(args) => {
            let config = resolve_config(
                &file_config,
                &args.database_args,
                Some(&args.directory_args),
            );

            info!("Running revert pass");
            commands::cmd_run(&config, Direction::Down, args.force, args.format).await
        }
        Commands::List(args) => {
            let config = resolve_config(
                &file_config,
                &args.database_args,
                Some(&args.directory_args),
            );

            info!("Listing migrations");
            commands::cmd_list(&config, args.filter, args.write).await
        }
        Commands::Status(args) => {
            let config = resolve_config(&file_config, &args.database_args, None);

            info!("Checking migration status");
            commands::cmd_status(&config).await
        }
    }
}

fn resolve_config(
    file_config: &config::ConfigInput,
    database_args: &config::DatabaseArgs,
    directory_args: Option<&config::DirectoryArgs>,
) -> config::Config {
    let cli_config = config::ConfigInput {
        database: Some(database_args.clone().into()),
        directories: directory_args.map(|args| args.clone().into()),
        migration: None,
    };

    config::ConfigBuilder::new()
        .with_file(file_config.clone())
        .with_cli_args(cli_config)
        .resolve()
}
