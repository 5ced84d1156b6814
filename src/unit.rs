use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use std::path::{Path, PathBuf};

/// A single named migration step that can be applied or reverted.
///
/// Units are resolved fresh on every run and never persisted; only their
/// application record lives in the ledger. `declared_table` and `apply_sql`
/// are optional capabilities consumed by the target-table prober.
#[async_trait]
pub trait MigrationUnit: Send + Sync {
    /// Stable logical identifier for this unit
    fn identifier(&self) -> &str;

    /// Explicitly declared target table, when the author provided one
    fn declared_table(&self) -> Option<&str> {
        None
    }

    /// Source of the apply body, when available for static inspection
    fn apply_sql(&self) -> Option<&str> {
        None
    }

    async fn apply(&self, pool: &PgPool) -> Result<()>;

    async fn revert(&self, pool: &PgPool) -> Result<()>;
}

/// A migration unit backed by a `.sql` artifact with `-- up` / `-- down`
/// sections and an optional `-- table:` declaration.
#[derive(Debug, Clone)]
pub struct SqlUnit {
    identifier: String,
    path: PathBuf,
    table: Option<String>,
    up_sql: String,
    down_sql: String,
}

impl SqlUnit {
    pub fn load(identifier: &str, path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read migration artifact {}", path.display()))?;
        Self::parse(identifier, path, &content)
    }

    /// Split an artifact into up/down sections.
    ///
    /// Both section markers are required: a unit must expose the full
    /// apply/revert contract to be resolvable. An empty `-- down` body is a
    /// valid no-op revert.
    pub fn parse(identifier: &str, path: &Path, content: &str) -> Result<Self> {
        #[derive(Clone, Copy)]
        enum Section {
            Up,
            Down,
        }

        let mut up_lines: Vec<&str> = Vec::new();
        let mut down_lines: Vec<&str> = Vec::new();
        let mut table = None;
        let mut section: Option<Section> = None;
        let mut saw_up = false;
        let mut saw_down = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if let Some(rest) = trimmed.strip_prefix("-- table:") {
                table = Some(rest.trim().to_string());
                continue;
            }
            if is_section_marker(trimmed, "up") {
                section = Some(Section::Up);
                saw_up = true;
                continue;
            }
            if is_section_marker(trimmed, "down") {
                section = Some(Section::Down);
                saw_down = true;
                continue;
            }

            match section {
                Some(Section::Up) => up_lines.push(line),
                Some(Section::Down) => down_lines.push(line),
                // Lines before the first marker (file header comments)
                None => {}
            }
        }

        if !saw_up || !saw_down {
            anyhow::bail!(
                "Migration artifact {} must contain both '-- up' and '-- down' sections",
                path.display()
            );
        }

        let up_sql = up_lines.join("\n").trim().to_string();
        let down_sql = down_lines.join("\n").trim().to_string();

        Ok(Self {
            identifier: identifier.to_string(),
            path: path.to_path_buf(),
            table: table.filter(|t| !t.is_empty()),
            up_sql,
            down_sql,
        })
    }
}

/// Match `-- up`, `-- down`, `-- Up migration` etc. without matching
/// ordinary comments like `-- update the index`.
fn is_section_marker(line: &str, word: &str) -> bool {
    let Some(rest) = line.strip_prefix("--") else {
        return false;
    };
    let rest = rest.trim_start();
    if rest.len() < word.len() || !rest.is_char_boundary(word.len()) {
        return false;
    }
    rest[..word.len()].eq_ignore_ascii_case(word)
        && rest[word.len()..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_ascii_alphanumeric())
}

#[async_trait]
impl MigrationUnit for SqlUnit {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    fn declared_table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    fn apply_sql(&self) -> Option<&str> {
        Some(&self.up_sql)
    }

    async fn apply(&self, pool: &PgPool) -> Result<()> {
        if self.up_sql.is_empty() {
            return Ok(());
        }
        sqlx::raw_sql(&self.up_sql)
            .execute(pool)
            .await
            .with_context(|| {
                format!(
                    "Apply failed for migration '{}' ({})",
                    self.identifier,
                    self.path.display()
                )
            })?;
        Ok(())
    }

    async fn revert(&self, pool: &PgPool) -> Result<()> {
        if self.down_sql.is_empty() {
            return Ok(());
        }
        sqlx::raw_sql(&self.down_sql)
            .execute(pool)
            .await
            .with_context(|| {
                format!(
                    "Revert failed for migration '{}' ({})",
                    self.identifier,
                    self.path.display()
                )
            })?;
        Ok(())
    }
}
