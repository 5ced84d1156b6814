use crate::config::Config;
use crate::db::connection::connect_with_retry;
use crate::db::inspector::PgSchemaInspector;
use crate::ledger::PgLedger;
use crate::report::Direction;
use crate::resolver::Resolver;
use crate::runner::Runner;
use crate::sequence;
use anyhow::Result;
use console::style;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::Arc;

/// Report output format for `up` / `down`
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ReportFormat {
    /// Human-readable report
    Text,
    /// Machine-readable report for scripting
    Json,
}

/// Run the apply or revert pass over the sequence file.
///
/// Per-unit failures end up in the printed report; only infrastructure
/// failures (unreachable database, unusable ledger, missing sequence file)
/// return an error and a non-zero exit.
pub async fn cmd_run(
    config: &Config,
    direction: Direction,
    force: bool,
    format: ReportFormat,
) -> Result<()> {
    let url = config.database.require_url()?;

    let sequence_file = Path::new(&config.directories.sequence_file);
    let order = sequence::load_sequence(sequence_file)?;
    if order.is_empty() {
        println!("Sequence file {} is empty - nothing to run", sequence_file.display());
        return Ok(());
    }

    if direction == Direction::Down && !force {
        confirm_revert(order.len())?;
    }

    if format == ReportFormat::Text {
        match direction {
            Direction::Up => println!(
                "{} {} migrations",
                style("Applying").green().bold(),
                order.len()
            ),
            Direction::Down => println!(
                "{} up to {} migrations",
                style("Reverting").yellow().bold(),
                order.len()
            ),
        }
    }

    let pool = connect_with_retry(url).await?;
    let ledger = PgLedger::new(pool.clone(), &config.migration.tracking_table)?;
    ledger.ensure_table().await?;
    let inspector = PgSchemaInspector::new(pool.clone(), config.migration.target_schema.clone());
    let resolver = Resolver::new(&config.directories.migrations);

    let runner = Runner::new(pool.clone(), Arc::new(ledger), Arc::new(inspector));
    let report = match direction {
        Direction::Up => runner.apply_pass(&order, &resolver).await?,
        Direction::Down => runner.revert_pass(&order, &resolver).await?,
    };

    match format {
        ReportFormat::Text => print!("{}", report.render()),
        ReportFormat::Json => println!("{}", report.render_json()?),
    }

    pool.close().await;
    Ok(())
}

fn confirm_revert(count: usize) -> Result<()> {
    if !std::io::stdin().is_terminal() {
        anyhow::bail!(
            "Refusing to revert {} migrations without --force in non-interactive mode",
            count
        );
    }

    let confirmed = dialoguer::Confirm::new()
        .with_prompt(format!("This will revert up to {} migrations. Continue?", count))
        .default(false)
        .interact()?;

    if !confirmed {
        anyhow::bail!("Revert cancelled");
    }

    Ok(())
}
