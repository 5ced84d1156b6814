use crate::config::Config;
use crate::db::connection::connect_with_retry;
use crate::ledger::{Ledger, PgLedger};
use anyhow::Result;
use itertools::Itertools;

/// Show applied ledger entries grouped by batch.
pub async fn cmd_status(config: &Config) -> Result<()> {
    let url = config.database.require_url()?;
    let pool = connect_with_retry(url).await?;
    let ledger = PgLedger::new(pool.clone(), &config.migration.tracking_table)?;
    ledger.ensure_table().await?;

    let entries = ledger.entries().await?;
    if entries.is_empty() {
        println!("No migrations have been applied");
    } else {
        let grouped = entries.into_iter().chunk_by(|entry| entry.batch);
        for (batch, group) in &grouped {
            println!("Batch {}:", batch);
            for entry in group {
                println!("  {}", entry.identifier);
            }
        }
    }

    pool.close().await;
    Ok(())
}
