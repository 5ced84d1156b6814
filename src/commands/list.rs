use crate::config::Config;
use crate::db::connection::connect_with_retry;
use crate::ledger::PgLedger;
use crate::sequence::{self, ListFilter};
use anyhow::Result;
use itertools::Itertools;
use std::path::Path;

/// Print or regenerate the sequence file from discovered identifiers.
///
/// `--filter pending` and `--filter executed` consult the ledger;
/// `--filter all` works offline.
pub async fn cmd_list(config: &Config, filter: ListFilter, write: bool) -> Result<()> {
    let migrations_dir = Path::new(&config.directories.migrations);
    let discovered = sequence::discover_identifiers(migrations_dir)?;

    let identifiers = if filter == ListFilter::All {
        discovered
    } else {
        let url = config.database.require_url()?;
        let pool = connect_with_retry(url).await?;
        let ledger = PgLedger::new(pool.clone(), &config.migration.tracking_table)?;
        ledger.ensure_table().await?;
        let filtered = sequence::filter_identifiers(discovered, filter, &ledger).await?;
        pool.close().await;
        filtered
    };

    if write {
        let sequence_file = Path::new(&config.directories.sequence_file);
        sequence::write_sequence(sequence_file, &identifiers)?;
        println!(
            "Updated {} with {} migrations",
            sequence_file.display(),
            identifiers.len()
        );
    } else if identifiers.is_empty() {
        println!("No matching migrations found in {}", migrations_dir.display());
    } else {
        println!("{}", identifiers.iter().join("\n"));
    }

    Ok(())
}
