use crate::config::TrackingTable;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgPool, Row};

/// A persisted application record: one row per applied migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub identifier: String,
    pub batch: i64,
}

/// Persisted ledger of applied migrations.
///
/// Identifiers are unique within the ledger. Each mutation commits
/// independently; no transaction spans a full run, so a mid-run failure
/// leaves the ledger consistent with exactly the units that individually
/// succeeded or were skip-recorded.
#[async_trait]
pub trait Ledger: Send + Sync {
    async fn exists(&self, identifier: &str) -> Result<bool>;

    /// Record an identifier in the given batch. No-op if already present
    /// (checked then inserted, not a race-free upsert).
    async fn insert(&self, identifier: &str, batch: i64) -> Result<()>;

    async fn delete(&self, identifier: &str) -> Result<()>;

    /// `max(batch) + 1`, or 1 when the ledger is empty.
    async fn next_batch(&self) -> Result<i64>;

    /// All entries ordered by batch, then identifier.
    async fn entries(&self) -> Result<Vec<LedgerEntry>>;
}

/// Ledger backed by a Postgres tracking table `{migration, batch}`.
pub struct PgLedger {
    pool: PgPool,
    table: String,
}

impl PgLedger {
    pub fn new(pool: PgPool, tracking_table: &TrackingTable) -> Result<Self> {
        Ok(Self {
            pool,
            table: format_tracking_table_name(tracking_table)?,
        })
    }

    /// Create the tracking table if it does not exist yet.
    pub async fn ensure_table(&self) -> Result<()> {
        sqlx::query(&format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                migration TEXT PRIMARY KEY,
                batch BIGINT NOT NULL
            )
            "#,
            self.table
        ))
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to create tracking table {}", self.table))?;

        Ok(())
    }
}

#[async_trait]
impl Ledger for PgLedger {
    async fn exists(&self, identifier: &str) -> Result<bool> {
        let row = sqlx::query(&format!(
            "SELECT COUNT(*) as count FROM {} WHERE migration = $1",
            self.table
        ))
        .bind(identifier)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to query tracking table {}", self.table))?;

        let count: i64 = row.get("count");
        Ok(count > 0)
    }

    async fn insert(&self, identifier: &str, batch: i64) -> Result<()> {
        if self.exists(identifier).await? {
            return Ok(());
        }

        sqlx::query(&format!(
            "INSERT INTO {} (migration, batch) VALUES ($1, $2)",
            self.table
        ))
        .bind(identifier)
        .bind(batch)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to record migration '{}' in ledger", identifier))?;

        Ok(())
    }

    async fn delete(&self, identifier: &str) -> Result<()> {
        sqlx::query(&format!("DELETE FROM {} WHERE migration = $1", self.table))
            .bind(identifier)
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to remove migration '{}' from ledger", identifier))?;

        Ok(())
    }

    async fn next_batch(&self) -> Result<i64> {
        let max: i64 = sqlx::query_scalar(&format!(
            "SELECT COALESCE(MAX(batch), 0) FROM {}",
            self.table
        ))
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to query max batch from {}", self.table))?;

        Ok(max + 1)
    }

    async fn entries(&self) -> Result<Vec<LedgerEntry>> {
        let rows = sqlx::query_as::<_, (String, i64)>(&format!(
            "SELECT migration, batch FROM {} ORDER BY batch, migration",
            self.table
        ))
        .fetch_all(&self.pool)
        .await
        .with_context(|| format!("Failed to list entries from {}", self.table))?;

        Ok(rows
            .into_iter()
            .map(|(identifier, batch)| LedgerEntry { identifier, batch })
            .collect())
    }
}

/// Format the schema-qualified tracking table name for SQL interpolation.
/// Validates both parts as SQL identifiers before quoting them.
pub fn format_tracking_table_name(tracking_table: &TrackingTable) -> Result<String> {
    fn is_valid_sql_identifier(name: &str) -> bool {
        let mut chars = name.chars();
        let Some(first) = chars.next() else {
            return false;
        };
        if !first.is_alphabetic() && first != '_' {
            return false;
        }
        chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
    }

    if !is_valid_sql_identifier(&tracking_table.schema) {
        return Err(anyhow::anyhow!(
            "Invalid tracking schema '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
            tracking_table.schema
        ));
    }

    if !is_valid_sql_identifier(&tracking_table.name) {
        return Err(anyhow::anyhow!(
            "Invalid tracking table '{}': must contain only letters, numbers, underscores, and dollar signs, starting with letter or underscore",
            tracking_table.name
        ));
    }

    Ok(format!(
        r#""{}"."{}""#,
        tracking_table.schema, tracking_table.name
    ))
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// In-memory ledger for runner tests.
    #[derive(Default)]
    pub struct MemoryLedger {
        rows: Mutex<BTreeMap<String, i64>>,
    }

    impl MemoryLedger {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Ledger for MemoryLedger {
        async fn exists(&self, identifier: &str) -> Result<bool> {
            Ok(self.rows.lock().unwrap().contains_key(identifier))
        }

        async fn insert(&self, identifier: &str, batch: i64) -> Result<()> {
            self.rows
                .lock()
                .unwrap()
                .entry(identifier.to_string())
                .or_insert(batch);
            Ok(())
        }

        async fn delete(&self, identifier: &str) -> Result<()> {
            self.rows.lock().unwrap().remove(identifier);
            Ok(())
        }

        async fn next_batch(&self) -> Result<i64> {
            let max = self.rows.lock().unwrap().values().copied().max().unwrap_or(0);
            Ok(max + 1)
        }

        async fn entries(&self) -> Result<Vec<LedgerEntry>> {
            let mut entries: Vec<LedgerEntry> = self
                .rows
                .lock()
                .unwrap()
                .iter()
                .map(|(identifier, batch)| LedgerEntry {
                    identifier: identifier.clone(),
                    batch: *batch,
                })
                .collect();
            entries.sort_by(|a, b| a.batch.cmp(&b.batch).then(a.identifier.cmp(&b.identifier)));
            Ok(entries)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::MemoryLedger;
    use super::*;

    fn tracking(schema: &str, name: &str) -> TrackingTable {
        TrackingTable {
            schema: schema.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_format_tracking_table_name() {
        let formatted = format_tracking_table_name(&tracking("public", "migrations")).unwrap();
        assert_eq!(formatted, r#""public"."migrations""#);
    }

    #[test]
    fn test_format_tracking_table_rejects_injection() {
        assert!(format_tracking_table_name(&tracking("public", "x; DROP TABLE y")).is_err());
        assert!(format_tracking_table_name(&tracking("", "migrations")).is_err());
        assert!(format_tracking_table_name(&tracking("public", "1st")).is_err());
    }

    #[test]
    fn test_format_tracking_table_allows_underscore_and_dollar() {
        assert!(format_tracking_table_name(&tracking("_app", "my$migrations")).is_ok());
    }

    #[tokio::test]
    async fn test_memory_ledger_insert_is_idempotent() {
        let ledger = MemoryLedger::new();
        ledger.insert("CreateUsersTable", 1).await.unwrap();
        ledger.insert("CreateUsersTable", 5).await.unwrap();

        let entries = ledger.entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].batch, 1);
    }

    #[tokio::test]
    async fn test_memory_ledger_next_batch() {
        let ledger = MemoryLedger::new();
        assert_eq!(ledger.next_batch().await.unwrap(), 1);

        ledger.insert("a", 1).await.unwrap();
        ledger.insert("b", 1).await.unwrap();
        assert_eq!(ledger.next_batch().await.unwrap(), 2);

        ledger.insert("c", 2).await.unwrap();
        assert_eq!(ledger.next_batch().await.unwrap(), 3);

        ledger.delete("c").await.unwrap();
        assert_eq!(ledger.next_batch().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_memory_ledger_exists_and_delete() {
        let ledger = MemoryLedger::new();
        assert!(!ledger.exists("a").await.unwrap());

        ledger.insert("a", 1).await.unwrap();
        assert!(ledger.exists("a").await.unwrap());

        ledger.delete("a").await.unwrap();
        assert!(!ledger.exists("a").await.unwrap());
    }
}
