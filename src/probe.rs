use crate::resolver::camel_to_snake;
use crate::unit::MigrationUnit;

/// Best-effort detection of the table a unit manages, used for the
/// idempotent-skip decision. Resolution order, first match wins:
///
/// 1. the unit's declared table (artifact annotation or trait override)
/// 2. a `CREATE TABLE` statement found in the apply body
/// 3. the `Create<Name>Table` identifier convention
///
/// `None` means unknown; the runner then attempts the operation instead of
/// blocking on uncertainty.
pub fn probe_target_table(unit: &dyn MigrationUnit) -> Option<String> {
    if let Some(table) = unit.declared_table() {
        return Some(table.to_string());
    }
    if let Some(sql) = unit.apply_sql()
        && let Some(table) = table_from_create(sql)
    {
        return Some(table);
    }
    table_from_identifier(unit.identifier())
}

/// Scan an apply body for `CREATE TABLE [IF NOT EXISTS] <name>` and extract
/// the bare table name. Token-based, tolerant of quoting and schema
/// qualification; heuristic, not a SQL parser.
pub fn table_from_create(sql: &str) -> Option<String> {
    let mut tokens = sql.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        if !token.eq_ignore_ascii_case("create") {
            continue;
        }
        if !tokens.peek().is_some_and(|t| t.eq_ignore_ascii_case("table")) {
            continue;
        }
        tokens.next();

        let mut name = tokens.next()?;
        if name.eq_ignore_ascii_case("if") {
            if !tokens.next().is_some_and(|t| t.eq_ignore_ascii_case("not")) {
                return None;
            }
            if !tokens
                .next()
                .is_some_and(|t| t.eq_ignore_ascii_case("exists"))
            {
                return None;
            }
            name = tokens.next()?;
        }
        return normalize_table_name(name);
    }

    None
}

/// Derive a table name from the `Create<Name>Table` naming convention:
/// `CreateUsersTable` is assumed to manage `users`.
pub fn table_from_identifier(identifier: &str) -> Option<String> {
    let inner = identifier
        .strip_prefix("Create")?
        .strip_suffix("Table")
        .filter(|inner| !inner.is_empty())?;
    if !inner.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
        return None;
    }
    Some(camel_to_snake(inner))
}

fn normalize_table_name(token: &str) -> Option<String> {
    // The name token may carry an attached column list: `users(id`
    let bare = token.split('(').next().unwrap_or(token);
    // Strip schema qualification and identifier quotes
    let bare = bare.rsplit('.').next().unwrap_or(bare);
    let bare = bare.trim_matches('"').trim_matches(';');
    if bare.is_empty() {
        return None;
    }
    Some(bare.to_string())
}
