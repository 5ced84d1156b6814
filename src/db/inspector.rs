use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;

/// Checks whether a schema object already exists in the target database.
/// Injected into the runner so the skip policy is testable without a
/// live server.
#[async_trait]
pub trait SchemaInspector: Send + Sync {
    async fn has_table(&self, table: &str) -> Result<bool>;
}

/// Inspector backed by `information_schema.tables`.
pub struct PgSchemaInspector {
    pool: PgPool,
    schema: String,
}

impl PgSchemaInspector {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }
}

#[async_trait]
impl SchemaInspector for PgSchemaInspector {
    async fn has_table(&self, table: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = $1 AND table_name = $2
            )
            "#,
        )
        .bind(&self.schema)
        .bind(table)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to check existence of table '{}'", table))?;

        Ok(exists)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// In-memory inspector doubling as the fake schema state for runner
    /// tests; instrumented units create and drop tables in it.
    #[derive(Default)]
    pub struct MemoryInspector {
        tables: Mutex<HashSet<String>>,
    }

    impl MemoryInspector {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn create_table(&self, table: &str) {
            self.tables.lock().unwrap().insert(table.to_string());
        }

        pub fn drop_table(&self, table: &str) {
            self.tables.lock().unwrap().remove(table);
        }
    }

    #[async_trait]
    impl SchemaInspector for MemoryInspector {
        async fn has_table(&self, table: &str) -> Result<bool> {
            Ok(self.tables.lock().unwrap().contains(table))
        }
    }
}
