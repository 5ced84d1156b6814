use crate::db::error_context::{DbErrorKind, SqlErrorContext};
use crate::db::inspector::SchemaInspector;
use crate::ledger::Ledger;
use crate::probe::probe_target_table;
use crate::report::{Direction, Outcome, RunReport};
use crate::resolver::Resolver;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{debug, info};

/// Drives apply and revert passes over the caller-supplied ordered list.
///
/// Per-unit failures are classified and recorded in the report; they never
/// abort the pass. The only errors that propagate out of a pass are fatal
/// infrastructure failures (ledger or inspector unreachable).
pub struct Runner {
    pool: PgPool,
    ledger: Arc<dyn Ledger>,
    inspector: Arc<dyn SchemaInspector>,
}

impl Runner {
    pub fn new(pool: PgPool, ledger: Arc<dyn Ledger>, inspector: Arc<dyn SchemaInspector>) -> Self {
        Self {
            pool,
            ledger,
            inspector,
        }
    }

    /// Forward pass: apply each unit in list order.
    ///
    /// Units whose target table already exists are recorded in the ledger
    /// without executing apply (pre-existing schema counts as applied).
    /// All units applied in one pass share a single batch number.
    pub async fn apply_pass(&self, order: &[String], resolver: &Resolver) -> anyhow::Result<RunReport> {
        let mut report = RunReport::new(Direction::Up);
        let batch = self.ledger.next_batch().await?;
        info!("Starting apply pass over {} migrations (batch {})", order.len(), batch);

        for identifier in order {
            let Some(unit) = resolver.resolve(identifier) else {
                report.record(identifier, Outcome::Skipped, Some("resolution failure".to_string()));
                continue;
            };

            if let Some(table) = probe_target_table(unit.as_ref())
                && self.inspector.has_table(&table).await?
            {
                self.ledger.insert(identifier, batch).await?;
                report.record(
                    identifier,
                    Outcome::Skipped,
                    Some(format!("target table '{}' already exists", table)),
                );
                continue;
            }

            debug!("Applying '{}'", identifier);
            match unit.apply(&self.pool).await {
                Ok(()) => {
                    self.ledger.insert(identifier, batch).await?;
                    report.record(identifier, Outcome::Applied, None);
                }
                Err(err) => {
                    self.record_apply_failure(identifier, &err, batch, &mut report)
                        .await?
                }
            }
        }

        Ok(report)
    }

    /// Backward pass: revert each unit in exact reverse list order.
    ///
    /// A unit whose target table is already absent is treated as reverted:
    /// its ledger entry is deleted without executing revert. Failures are
    /// caught symmetrically with the apply pass.
    pub async fn revert_pass(&self, order: &[String], resolver: &Resolver) -> anyhow::Result<RunReport> {
        let mut report = RunReport::new(Direction::Down);
        info!("Starting revert pass over {} migrations", order.len());

        for identifier in order.iter().rev() {
            let Some(unit) = resolver.resolve(identifier) else {
                report.record(identifier, Outcome::Skipped, Some("resolution failure".to_string()));
                continue;
            };

            if let Some(table) = probe_target_table(unit.as_ref())
                && !self.inspector.has_table(&table).await?
            {
                self.ledger.delete(identifier).await?;
                report.record(
                    identifier,
                    Outcome::Skipped,
                    Some(format!("target table '{}' does not exist", table)),
                );
                continue;
            }

            debug!("Reverting '{}'", identifier);
            match unit.revert(&self.pool).await {
                Ok(()) => {
                    self.ledger.delete(identifier).await?;
                    report.record(identifier, Outcome::Reverted, None);
                }
                Err(err) => {
                    let reason = match SqlErrorContext::from_error_chain(&err) {
                        Some(ctx) => format!("database error: {}", ctx.message),
                        None => format!("{:#}", err),
                    };
                    report.record(identifier, Outcome::Failed, Some(reason));
                }
            }
        }

        Ok(report)
    }

    async fn record_apply_failure(
        &self,
        identifier: &str,
        err: &anyhow::Error,
        batch: i64,
        report: &mut RunReport,
    ) -> anyhow::Result<()> {
        let Some(ctx) = SqlErrorContext::from_error_chain(err) else {
            report.record(identifier, Outcome::Failed, Some(format!("{:#}", err)));
            return Ok(());
        };

        match ctx.kind() {
            DbErrorKind::DuplicateObject => {
                // The target existed even though probing missed it; record
                // it as applied, same as the probe-skip path.
                self.ledger.insert(identifier, batch).await?;
                report.record(
                    identifier,
                    Outcome::Skipped,
                    Some(format!("target already existed at apply time ({})", ctx.message)),
                );
            }
            DbErrorKind::MissingReference { object } => {
                report.record(
                    identifier,
                    Outcome::Failed,
                    Some(format!("database error: {}", ctx.message)),
                );
                if let Some(object) = object {
                    report.suggest(format!(
                        "'{}' failed on a missing reference to '{}'; move it after the migration that creates '{}'",
                        identifier, object, object
                    ));
                }
            }
            DbErrorKind::Other => {
                report.record(
                    identifier,
                    Outcome::Failed,
                    Some(format!("database error: {}", ctx.message)),
                );
            }
        }

        Ok(())
    }
}
