//! Identifier filtering for table and column names.
//!
//! Every identifier handed to a builder verb is normalized (trimmed, lower-cased,
//! spaces turned into underscores) and then checked against a strict allow-list:
//! `[a-z_][a-z0-9_]*`. Table names additionally get the configured table prefix.
//!
//! Values never pass through here; they always travel as bound parameters.
//!
//! # Example
//! ```ignore
//! use chainsql::ident;
//!
//! assert_eq!(ident::column("Created At")?, "created_at");
//! assert_eq!(ident::table("app_", "Users")?, "app_users");
//! # Ok::<(), chainsql::OrmError>(())
//! ```

use crate::error::{OrmError, OrmResult};

/// Lower-case, trim, and replace inner whitespace with underscores.
pub fn normalize(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Filter a column identifier.
pub fn column(name: &str) -> OrmResult<String> {
    let name = normalize(name);
    validate(&name)?;
    Ok(name)
}

/// Filter a table identifier and prepend the table prefix.
pub fn table(prefix: &str, name: &str) -> OrmResult<String> {
    let name = format!("{}{}", prefix, normalize(name));
    validate(&name)?;
    Ok(name)
}

/// A column reference, optionally qualified with a (prefixed) table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub table: Option<String>,
    pub column: String,
}

impl ColumnRef {
    /// Parse `column` or `table.column`.
    pub fn parse(prefix: &str, input: &str) -> OrmResult<Self> {
        match input.split_once('.') {
            Some((t, c)) => Ok(Self {
                table: Some(table(prefix, t)?),
                column: column(c)?,
            }),
            None => Ok(Self {
                table: None,
                column: column(input)?,
            }),
        }
    }
}

/// Split a comma-separated column list, skipping empty entries.
pub fn split_list(list: &str) -> Vec<&str> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Screen a raw SQL fragment (join ON expressions, column type specs).
///
/// These fragments are inserted verbatim, so statement separators and comment
/// markers are refused.
pub fn raw_fragment(kind: &str, sql: &str) -> OrmResult<String> {
    let trimmed = sql.trim();
    if trimmed.is_empty() {
        return Err(OrmError::usage(format!("{kind} cannot be empty")));
    }
    for marker in [";", "--", "/*", "*/", "\0"] {
        if trimmed.contains(marker) {
            return Err(OrmError::usage(format!(
                "{kind} contains forbidden sequence '{}'",
                marker.escape_default()
            )));
        }
    }
    Ok(trimmed.to_string())
}

fn validate(name: &str) -> OrmResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(OrmError::usage("Identifier cannot be empty"));
    };
    if !(first == '_' || first.is_ascii_lowercase()) {
        return Err(OrmError::usage(format!(
            "Invalid identifier start character '{first}' in '{name}'"
        )));
    }
    if let Some(bad) = chars.find(|c| !(*c == '_' || c.is_ascii_lowercase() || c.is_ascii_digit())) {
        return Err(OrmError::usage(format!(
            "Invalid character '{bad}' in identifier '{name}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_is_normalized() {
        assert_eq!(column("Email").unwrap(), "email");
        assert_eq!(column("  created at ").unwrap(), "created_at");
    }

    #[test]
    fn table_gets_prefix() {
        assert_eq!(table("wp_", "Posts").unwrap(), "wp_posts");
        assert_eq!(table("", "users").unwrap(), "users");
    }

    #[test]
    fn rejects_injection_attempts() {
        assert!(column("id; DROP TABLE users").is_err());
        assert!(column("name'--").is_err());
        assert!(table("", "users)").is_err());
    }

    #[test]
    fn rejects_start_digit() {
        assert!(column("1col").is_err());
    }

    #[test]
    fn rejects_empty() {
        assert!(column("").is_err());
        assert!(column("   ").is_err());
    }

    #[test]
    fn dotted_reference() {
        let r = ColumnRef::parse("p_", "Orders.Total").unwrap();
        assert_eq!(r.table.as_deref(), Some("p_orders"));
        assert_eq!(r.column, "total");

        let r = ColumnRef::parse("p_", "total").unwrap();
        assert_eq!(r.table, None);
    }

    #[test]
    fn list_splitting() {
        assert_eq!(split_list("a, b,,c "), ["a", "b", "c"]);
    }

    #[test]
    fn raw_fragment_screening() {
        assert_eq!(raw_fragment("ON", " t1.x = t2.y ").unwrap(), "t1.x = t2.y");
        assert!(raw_fragment("ON", "1=1; DROP TABLE x").is_err());
        assert!(raw_fragment("ON", "1=1 -- hi").is_err());
        assert!(raw_fragment("ON", "").is_err());
    }
}
