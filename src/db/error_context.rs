//! Structured extraction and classification of PostgreSQL errors.
//! Classification is by SQLSTATE code, never by matching rendered messages.

use sqlx::postgres::PgDatabaseError;

/// SQLSTATE codes treated as "the target object already exists"
const DUPLICATE_CODES: [&str; 4] = ["42P07", "42710", "42P06", "23505"];

/// SQLSTATE codes treated as "a referenced object is missing"
const MISSING_REFERENCE_CODES: [&str; 2] = ["42P01", "23503"];

/// How a database failure should steer the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbErrorKind {
    /// The object the unit creates already exists; success-equivalent.
    DuplicateObject,
    /// A referenced object does not exist; likely an ordering problem.
    /// Carries the referenced object's name when the error exposes it.
    MissingReference { object: Option<String> },
    /// Any other database-level failure.
    Other,
}

/// Structured context extracted from a PostgreSQL error.
#[derive(Debug, Clone)]
pub struct SqlErrorContext {
    pub message: String,
    pub detail: Option<String>,
    #[allow(dead_code)]
    pub hint: Option<String>,
    /// SQLSTATE code (e.g. "42P07" for duplicate_table)
    pub code: Option<String>,
    /// Table the error is attached to, when the server reports one
    #[allow(dead_code)]
    pub table: Option<String>,
}

impl SqlErrorContext {
    /// Extract context from a sqlx error. Returns `None` for non-database
    /// errors (I/O, pool, decode), which classify as unexpected failures.
    pub fn from_sqlx_error(error: &sqlx::Error) -> Option<Self> {
        let db_error = error.as_database_error()?;

        // Postgres exposes richer fields than the generic driver interface
        if let Some(pg_error) = db_error.try_downcast_ref::<PgDatabaseError>() {
            return Some(Self {
                message: pg_error.message().to_string(),
                detail: pg_error.detail().map(str::to_string),
                hint: pg_error.hint().map(str::to_string),
                code: Some(pg_error.code().to_string()),
                table: pg_error.table().map(str::to_string),
            });
        }

        Some(Self {
            message: db_error.message().to_string(),
            detail: None,
            hint: None,
            code: db_error.code().map(|c| c.into_owned()),
            table: db_error.table().map(str::to_string),
        })
    }

    /// Walk an error chain down to the underlying sqlx error, if any.
    /// Context wrappers added with `.with_context()` are looked through.
    pub fn from_error_chain(error: &anyhow::Error) -> Option<Self> {
        error
            .chain()
            .find_map(|cause| cause.downcast_ref::<sqlx::Error>())
            .and_then(Self::from_sqlx_error)
    }

    pub fn kind(&self) -> DbErrorKind {
        let Some(code) = self.code.as_deref() else {
            return DbErrorKind::Other;
        };
        if DUPLICATE_CODES.contains(&code) {
            DbErrorKind::DuplicateObject
        } else if MISSING_REFERENCE_CODES.contains(&code) {
            DbErrorKind::MissingReference {
                object: self.referenced_object(),
            }
        } else {
            DbErrorKind::Other
        }
    }

    /// Name of the object a missing-reference error points at.
    ///
    /// For foreign-key violations the referenced table appears in the
    /// structured detail (`... is not present in table "users"`); for
    /// undefined_table the relation is the quoted token in the primary
    /// message (`relation "users" does not exist`).
    pub fn referenced_object(&self) -> Option<String> {
        match self.code.as_deref() {
            Some("23503") => self
                .detail
                .as_deref()
                .and_then(|detail| quoted_after(detail, "in table "))
                .or_else(|| quoted_after(&self.message, "in table ")),
            Some("42P01") => first_quoted(&self.message),
            _ => None,
        }
    }
}

fn first_quoted(s: &str) -> Option<String> {
    let start = s.find('"')? + 1;
    let len = s[start..].find('"')?;
    if len == 0 {
        return None;
    }
    Some(s[start..start + len].to_string())
}

fn quoted_after(s: &str, marker: &str) -> Option<String> {
    let idx = s.find(marker)?;
    first_quoted(&s[idx + marker.len()..])
}

#[cfg(test)]
pub(crate) mod testing {
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    /// Minimal `DatabaseError` for exercising classification without a
    /// live server.
    #[derive(Debug)]
    pub struct FakeDbError {
        message: String,
        code: Option<String>,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "{}", self.message)
        }
    }

    impl StdError for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            &self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.as_deref().map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            match self.code.as_deref() {
                Some("23505") => sqlx::error::ErrorKind::UniqueViolation,
                Some("23503") => sqlx::error::ErrorKind::ForeignKeyViolation,
                _ => sqlx::error::ErrorKind::Other,
            }
        }
    }

    /// Build an anyhow error wrapping a database error with the given
    /// SQLSTATE, the way a failed `apply()` surfaces one.
    pub fn db_error(code: &str, message: &str) -> anyhow::Error {
        anyhow::Error::new(sqlx::Error::Database(Box::new(FakeDbError {
            message: message.to_string(),
            code: Some(code.to_string()),
        })))
        .context("Apply failed")
    }
}

#[cfg(test)]
mod tests {
    use super::testing::db_error;
    use super::*;
    use rstest::rstest;

    fn ctx(code: Option<&str>, message: &str, detail: Option<&str>) -> SqlErrorContext {
        SqlErrorContext {
            message: message.to_string(),
            detail: detail.map(str::to_string),
            hint: None,
            code: code.map(str::to_string),
            table: None,
        }
    }

    #[rstest]
    #[case("42P07", "relation \"users\" already exists")]
    #[case("42710", "object already exists")]
    #[case("42P06", "schema \"app\" already exists")]
    #[case("23505", "duplicate key value violates unique constraint")]
    fn test_duplicate_codes(#[case] code: &str, #[case] message: &str) {
        assert_eq!(
            ctx(Some(code), message, None).kind(),
            DbErrorKind::DuplicateObject
        );
    }

    #[test]
    fn test_undefined_table_names_the_relation() {
        let kind = ctx(Some("42P01"), "relation \"posts\" does not exist", None).kind();
        assert_eq!(
            kind,
            DbErrorKind::MissingReference {
                object: Some("posts".to_string())
            }
        );
    }

    #[test]
    fn test_fk_violation_names_referenced_table_from_detail() {
        let kind = ctx(
            Some("23503"),
            "insert or update on table \"comments\" violates foreign key constraint \"comments_post_id_fkey\"",
            Some("Key (post_id)=(1) is not present in table \"posts\"."),
        )
        .kind();
        assert_eq!(
            kind,
            DbErrorKind::MissingReference {
                object: Some("posts".to_string())
            }
        );
    }

    #[test]
    fn test_fk_violation_without_detail_has_no_object() {
        let kind = ctx(
            Some("23503"),
            "insert or update violates foreign key constraint",
            None,
        )
        .kind();
        assert_eq!(kind, DbErrorKind::MissingReference { object: None });
    }

    #[test]
    fn test_unknown_code_is_other() {
        assert_eq!(ctx(Some("42601"), "syntax error", None).kind(), DbErrorKind::Other);
        assert_eq!(ctx(None, "connection reset", None).kind(), DbErrorKind::Other);
    }

    #[test]
    fn test_from_error_chain_looks_through_context() {
        let err = db_error("42P07", "relation \"users\" already exists");
        let ctx = SqlErrorContext::from_error_chain(&err).unwrap();
        assert_eq!(ctx.code.as_deref(), Some("42P07"));
        assert_eq!(ctx.kind(), DbErrorKind::DuplicateObject);
    }

    #[test]
    fn test_from_error_chain_on_plain_error() {
        let err = anyhow::anyhow!("filesystem exploded");
        assert!(SqlErrorContext::from_error_chain(&err).is_none());
    }

    #[test]
    fn test_first_quoted() {
        assert_eq!(
            first_quoted("relation \"users\" does not exist").as_deref(),
            Some("users")
        );
        assert_eq!(first_quoted("no quotes here"), None);
        assert_eq!(first_quoted("empty \"\" quotes"), None);
    }
}
