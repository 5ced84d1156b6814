use crate::unit::{MigrationUnit, SqlUnit};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, warn};

type UnitFactory = Box<dyn Fn() -> Box<dyn MigrationUnit> + Send + Sync>;

/// Resolves a migration identifier to a unit instance.
///
/// Registered constructors win on exact identifier match; otherwise the
/// migrations directory is searched for a matching `.sql` artifact (exact
/// name first, then a camel-case to snake-case glob). Resolution never
/// executes apply or revert.
pub struct Resolver {
    registry: HashMap<String, UnitFactory>,
    migrations_dir: PathBuf,
}

impl Resolver {
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry: HashMap::new(),
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Register an explicit constructor for an identifier.
    ///
    /// Registered units take precedence over artifact lookup.
    pub fn register<F>(&mut self, identifier: &str, factory: F)
    where
        F: Fn() -> Box<dyn MigrationUnit> + Send + Sync + 'static,
    {
        self.registry.insert(identifier.to_string(), Box::new(factory));
    }

    /// Resolve an identifier to a unit, or `None` when nothing instantiable
    /// matches. Unresolvable identifiers are a per-unit skip for the runner,
    /// not an error.
    pub fn resolve(&self, identifier: &str) -> Option<Box<dyn MigrationUnit>> {
        if let Some(factory) = self.registry.get(identifier) {
            debug!("Resolved '{}' from registry", identifier);
            return Some(factory());
        }

        let path = self.locate_artifact(identifier)?;
        match SqlUnit::load(identifier, &path) {
            Ok(unit) => {
                debug!("Resolved '{}' from {}", identifier, path.display());
                Some(Box::new(unit))
            }
            Err(e) => {
                warn!(
                    "Artifact {} matched '{}' but is not a usable migration: {}",
                    path.display(),
                    identifier,
                    e
                );
                None
            }
        }
    }

    /// Locate the artifact for an identifier: `<id>.sql` exact match, then
    /// `*_<snake>.sql` / `<snake>.sql`, then a loose `*<id>*.sql` glob.
    fn locate_artifact(&self, identifier: &str) -> Option<PathBuf> {
        let exact = self.migrations_dir.join(format!("{identifier}.sql"));
        if exact.is_file() {
            return Some(exact);
        }

        let snake = camel_to_snake(identifier);
        let patterns = [
            format!("*_{snake}.sql"),
            format!("{snake}.sql"),
            format!("*{identifier}*.sql"),
        ];

        for pattern in patterns {
            let full = self.migrations_dir.join(&pattern);
            let Ok(paths) = glob::glob(full.to_str()?) else {
                continue;
            };
            let mut matches: Vec<PathBuf> = paths.flatten().filter(|p| p.is_file()).collect();
            matches.sort();
            if let Some(path) = matches.into_iter().next() {
                return Some(path);
            }
        }

        None
    }
}

/// Convert a camel-case identifier to a snake-case file-name fragment,
/// splitting only at lower-to-upper boundaries: `CreateUsersTable` becomes
/// `create_users_table`.
pub fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
            out.push(c);
        }
    }
    out
}
