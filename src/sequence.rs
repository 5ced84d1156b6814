use crate::ledger::Ledger;
use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::Path;

/// Which discovered identifiers a listing should include.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ListFilter {
    /// Every discoverable identifier
    All,
    /// Identifiers not yet recorded in the ledger
    Pending,
    /// Identifiers already recorded in the ledger
    Executed,
}

/// Load the ordered migration list from the sequence file.
///
/// The sequence file is the sole source of sequencing truth: the runner
/// consumes this order, it never derives one.
pub fn load_sequence(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).with_context(|| {
        format!(
            "Failed to read sequence file {} (generate one with 'seqmig list --write')",
            path.display()
        )
    })?;
    Ok(parse_sequence(&content))
}

/// One identifier per line; blank lines and `#` comments are skipped.
pub fn parse_sequence(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

/// Write identifiers to the sequence file with a generated-file header.
pub fn write_sequence(path: &Path, identifiers: &[String]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }

    let mut content = String::from(
        "# Ordered migration list. Edit this file to control execution order.\n\
         # Regenerated by 'seqmig list --write'.\n",
    );
    for identifier in identifiers {
        content.push_str(identifier);
        content.push('\n');
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write sequence file {}", path.display()))
}

/// Discover every migration identifier in the directory: the stem of each
/// `.sql` artifact, sorted by file name.
pub fn discover_identifiers(migrations_dir: &Path) -> Result<Vec<String>> {
    let mut identifiers = Vec::new();

    if !migrations_dir.exists() {
        return Ok(identifiers);
    }

    for entry in std::fs::read_dir(migrations_dir)
        .with_context(|| format!("Failed to read {}", migrations_dir.display()))?
    {
        let path = entry?.path();
        if path.extension().is_some_and(|ext| ext == "sql")
            && let Some(stem) = path.file_stem().and_then(|s| s.to_str())
        {
            identifiers.push(stem.to_string());
        }
    }

    identifiers.sort();
    Ok(identifiers)
}

/// Keep the identifiers matching the filter, preserving discovery order.
pub async fn filter_identifiers(
    identifiers: Vec<String>,
    filter: ListFilter,
    ledger: &dyn Ledger,
) -> Result<Vec<String>> {
    if filter == ListFilter::All {
        return Ok(identifiers);
    }

    let executed: HashSet<String> = ledger
        .entries()
        .await?
        .into_iter()
        .map(|entry| entry.identifier)
        .collect();

    Ok(identifiers
        .into_iter()
        .filter(|identifier| match filter {
            ListFilter::All => true,
            ListFilter::Pending => !executed.contains(identifier),
            ListFilter::Executed => executed.contains(identifier),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::testing::MemoryLedger;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sequence_skips_comments_and_blanks() {
        let content = "# header\n\nCreateUsersTable\n  CreatePostsTable  \n# trailing\n";
        assert_eq!(
            parse_sequence(content),
            vec!["CreateUsersTable", "CreatePostsTable"]
        );
    }

    #[test]
    fn test_write_then_load_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("migrations").join("sequence.list");
        let identifiers = vec!["CreateUsersTable".to_string(), "CreatePostsTable".to_string()];

        write_sequence(&path, &identifiers).unwrap();
        assert_eq!(load_sequence(&path).unwrap(), identifiers);

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.starts_with('#'));
    }

    #[test]
    fn test_load_missing_sequence_file_is_an_error() {
        let err = load_sequence(Path::new("/nonexistent/sequence.list")).unwrap_err();
        assert!(err.to_string().contains("sequence file"));
    }

    #[test]
    fn test_discover_identifiers_sorted_sql_only() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("02_create_posts_table.sql"), "").unwrap();
        fs::write(dir.path().join("01_create_users_table.sql"), "").unwrap();
        fs::write(dir.path().join("sequence.list"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        assert_eq!(
            discover_identifiers(dir.path()).unwrap(),
            vec!["01_create_users_table", "02_create_posts_table"]
        );
    }

    #[test]
    fn test_discover_missing_directory_is_empty() {
        assert!(
            discover_identifiers(Path::new("/nonexistent/migrations"))
                .unwrap()
                .is_empty()
        );
    }

    #[tokio::test]
    async fn test_filter_pending_and_executed() {
        let ledger = MemoryLedger::new();
        ledger.insert("a", 1).await.unwrap();

        let all = vec!["a".to_string(), "b".to_string()];

        let pending = filter_identifiers(all.clone(), ListFilter::Pending, &ledger)
            .await
            .unwrap();
        assert_eq!(pending, vec!["b"]);

        let executed = filter_identifiers(all.clone(), ListFilter::Executed, &ledger)
            .await
            .unwrap();
        assert_eq!(executed, vec!["a"]);

        let everything = filter_identifiers(all.clone(), ListFilter::All, &ledger)
            .await
            .unwrap();
        assert_eq!(everything, all);
    }
}
