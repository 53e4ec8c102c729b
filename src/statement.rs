//! SQL text for the statements the repository generates itself.
//!
//! Only identifiers are spliced into the text, and only after validation; every value is a
//! bound parameter.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::SqlRepoError;
use crate::translation::{PlaceholderStyle, max_placeholder, renumber_placeholders};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$")
        .expect("identifier pattern is valid")
});

/// Accept `name` or `schema.name` made of ASCII letters, digits and underscores.
///
/// # Errors
/// `SqlRepoError::InvalidIdentifier` for anything else.
pub fn validate_identifier(name: &str) -> Result<&str, SqlRepoError> {
    if IDENTIFIER.is_match(name) {
        Ok(name)
    } else {
        Err(SqlRepoError::InvalidIdentifier(name.to_owned()))
    }
}

fn placeholders(style: PlaceholderStyle, start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| style.placeholder(n))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `INSERT INTO table (c1, ..) VALUES ($1, ..) RETURNING id`
///
/// # Errors
/// `NoValues` when `columns` is empty, `InvalidIdentifier` for a bad table/column name.
pub fn insert_returning(
    style: PlaceholderStyle,
    table: &str,
    columns: &[&str],
    id_column: &str,
) -> Result<String, SqlRepoError> {
    if columns.is_empty() {
        return Err(SqlRepoError::NoValues);
    }
    let table = validate_identifier(table)?;
    let id_column = validate_identifier(id_column)?;
    let column_list = columns
        .iter()
        .map(|c| validate_identifier(c))
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
    Ok(format!(
        "INSERT INTO {table} ({column_list}) VALUES ({}) RETURNING {id_column}",
        placeholders(style, 1, columns.len())
    ))
}

fn require_predicate(predicate: &str) -> Result<&str, SqlRepoError> {
    let trimmed = predicate.trim();
    if trimmed.is_empty() {
        Err(SqlRepoError::MissingPredicate)
    } else {
        Ok(trimmed)
    }
}

/// `UPDATE table SET c1 = $1, .. WHERE <predicate>`, with the predicate's own placeholders
/// (numbered from 1 in either style) shifted past the SET placeholders.
///
/// # Errors
/// `MissingPredicate`, `NoValues` or `InvalidIdentifier`.
pub fn update_where<'c>(
    style: PlaceholderStyle,
    table: &str,
    columns: impl IntoIterator<Item = &'c str>,
    predicate: &str,
) -> Result<String, SqlRepoError> {
    let predicate = require_predicate(predicate)?;
    let table = validate_identifier(table)?;
    let mut assignments = Vec::new();
    for (i, column) in columns.into_iter().enumerate() {
        let column = validate_identifier(column)?;
        assignments.push(format!("{column} = {}", style.placeholder(i + 1)));
    }
    if assignments.is_empty() {
        return Err(SqlRepoError::NoValues);
    }
    let predicate = renumber_placeholders(predicate, style, assignments.len());
    Ok(format!(
        "UPDATE {table} SET {} WHERE {predicate}",
        assignments.join(", ")
    ))
}

/// `DELETE FROM table WHERE <predicate>` in the backend's placeholder style.
///
/// # Errors
/// `MissingPredicate` or `InvalidIdentifier`.
pub fn delete_where(
    style: PlaceholderStyle,
    table: &str,
    predicate: &str,
) -> Result<String, SqlRepoError> {
    let predicate = require_predicate(predicate)?;
    let table = validate_identifier(table)?;
    let predicate = renumber_placeholders(predicate, style, 0);
    Ok(format!("DELETE FROM {table} WHERE {predicate}"))
}

/// Check that a predicate does not reference more placeholders than arguments supplied.
///
/// # Errors
/// `ExecutionError` naming both counts.
pub fn check_arity(predicate: &str, args: usize) -> Result<(), SqlRepoError> {
    let referenced = max_placeholder(predicate);
    if referenced > args {
        return Err(SqlRepoError::ExecutionError(format!(
            "predicate references placeholder {referenced} but only {args} argument(s) were given"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validates_identifiers() {
        assert!(validate_identifier("users").is_ok());
        assert!(validate_identifier("public.users").is_ok());
        assert!(validate_identifier("_tmp1").is_ok());
        for bad in ["", "1users", "users; drop table x", "a.b.c", "na-me", "\"quoted\""] {
            assert!(
                matches!(validate_identifier(bad), Err(SqlRepoError::InvalidIdentifier(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn builds_insert_for_each_backend() {
        let sql = insert_returning(PlaceholderStyle::Postgres, "users", &["name", "age"], "id")
            .unwrap();
        assert_eq!(sql, "INSERT INTO users (name, age) VALUES ($1, $2) RETURNING id");

        let sql =
            insert_returning(PlaceholderStyle::Sqlite, "users", &["name"], "user_id").unwrap();
        assert_eq!(sql, "INSERT INTO users (name) VALUES (?1) RETURNING user_id");

        assert!(matches!(
            insert_returning(PlaceholderStyle::Sqlite, "users", &[], "id"),
            Err(SqlRepoError::NoValues)
        ));
    }

    #[test]
    fn builds_update_with_shifted_predicate() {
        let sql = update_where(
            PlaceholderStyle::Postgres,
            "users",
            ["age", "name"],
            "id = $1 and name <> $2",
        )
        .unwrap();
        assert_eq!(
            sql,
            "UPDATE users SET age = $1, name = $2 WHERE id = $3 and name <> $4"
        );

        let sql = update_where(PlaceholderStyle::Sqlite, "users", ["age"], " id = $1 ").unwrap();
        assert_eq!(sql, "UPDATE users SET age = ?1 WHERE id = ?2");
    }

    #[test]
    fn update_requires_predicate_and_values() {
        assert!(matches!(
            update_where(PlaceholderStyle::Postgres, "users", ["age"], "   "),
            Err(SqlRepoError::MissingPredicate)
        ));
        assert!(matches!(
            update_where(PlaceholderStyle::Postgres, "users", Vec::<&str>::new(), "id = $1"),
            Err(SqlRepoError::NoValues)
        ));
        assert!(matches!(
            update_where(PlaceholderStyle::Postgres, "users", ["bad col"], "id = $1"),
            Err(SqlRepoError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn builds_delete_in_native_style() {
        let sql = delete_where(PlaceholderStyle::Sqlite, "users", "id = $1").unwrap();
        assert_eq!(sql, "DELETE FROM users WHERE id = ?1");
        assert!(matches!(
            delete_where(PlaceholderStyle::Sqlite, "users", ""),
            Err(SqlRepoError::MissingPredicate)
        ));
    }

    #[test]
    fn arity_check_counts_highest_placeholder() {
        assert!(check_arity("a = $1 and b = $2", 2).is_ok());
        assert!(check_arity("a = $1 and b = $3", 2).is_err());
        assert!(check_arity("a is null", 0).is_ok());
    }

    #[test]
    fn huge_placeholder_numbers_are_errors_not_panics() {
        let predicate = format!("id = ${}", usize::MAX);
        let sql = update_where(PlaceholderStyle::Postgres, "t", ["a"], &predicate).unwrap();
        assert_eq!(sql, format!("UPDATE t SET a = $1 WHERE {predicate}"));
        assert!(matches!(
            check_arity(&predicate, 1),
            Err(SqlRepoError::ExecutionError(_))
        ));
    }
}
