//! ALTER TABLE statement rendering.
//!
//! Pure functions: identifiers are already filtered by the caller. MySQL changes
//! column properties with `MODIFY COLUMN` and a complete column definition, so
//! those renderers take the descriptor of the desired end state.

use crate::dialect::Dialect;
use crate::schema::ColumnDescriptor;

/// Full MySQL column definition (without the name) for a descriptor.
pub fn column_definition(column: &ColumnDescriptor) -> String {
    let mut sql = column.data_type.clone();
    if column.unsigned {
        sql.push_str(" UNSIGNED");
    }
    sql.push_str(if column.nullable { " NULL" } else { " NOT NULL" });
    if let Some(default) = &column.default {
        sql.push_str(" DEFAULT ");
        sql.push_str(default);
    }
    if column.auto_increment {
        sql.push_str(" AUTO_INCREMENT");
    }
    sql
}

fn modify(table: &str, column: &ColumnDescriptor) -> String {
    format!(
        "ALTER TABLE {table} MODIFY COLUMN {} {}",
        column.name,
        column_definition(column)
    )
}

pub fn add_column(dialect: Dialect, table: &str, column: &str, spec: &str) -> String {
    match dialect {
        Dialect::MySql => format!("ALTER TABLE {table} ADD {column} {spec}"),
        Dialect::Postgres => format!("ALTER TABLE {table} ADD COLUMN {column} {spec}"),
    }
}

pub fn drop_column(table: &str, column: &str) -> String {
    format!("ALTER TABLE {table} DROP COLUMN {column}")
}

pub fn modify_column(dialect: Dialect, table: &str, column: &str, spec: &str) -> String {
    match dialect {
        Dialect::MySql => format!("ALTER TABLE {table} MODIFY COLUMN {column} {spec}"),
        Dialect::Postgres => format!("ALTER TABLE {table} ALTER COLUMN {column} TYPE {spec}"),
    }
}

pub fn add_primary_key(table: &str, column: &str) -> String {
    format!("ALTER TABLE {table} ADD PRIMARY KEY ({column})")
}

/// Postgres drops the key by constraint name, `<table>_pkey` unless known.
pub fn drop_primary_key(dialect: Dialect, table: &str, constraint: Option<&str>) -> String {
    match dialect {
        Dialect::MySql => format!("ALTER TABLE {table} DROP PRIMARY KEY"),
        Dialect::Postgres => match constraint {
            Some(name) => format!("ALTER TABLE {table} DROP CONSTRAINT {name}"),
            None => format!("ALTER TABLE {table} DROP CONSTRAINT {table}_pkey"),
        },
    }
}

/// Change nullability; `target` is the column as it should end up.
pub fn set_nullable(dialect: Dialect, table: &str, target: &ColumnDescriptor) -> String {
    match dialect {
        Dialect::MySql => modify(table, target),
        Dialect::Postgres => format!(
            "ALTER TABLE {table} ALTER COLUMN {} {} NOT NULL",
            target.name,
            if target.nullable { "DROP" } else { "SET" }
        ),
    }
}

/// Postgres has no unsigned integers; a named CHECK constraint stands in.
pub fn set_unsigned(dialect: Dialect, table: &str, target: &ColumnDescriptor) -> String {
    match dialect {
        Dialect::MySql => modify(table, target),
        Dialect::Postgres if target.unsigned => format!(
            "ALTER TABLE {table} ADD CONSTRAINT {} CHECK ({} >= 0)",
            unsigned_check_name(table, &target.name),
            target.name
        ),
        Dialect::Postgres => format!(
            "ALTER TABLE {table} DROP CONSTRAINT {}",
            unsigned_check_name(table, &target.name)
        ),
    }
}

pub fn set_auto_increment(dialect: Dialect, table: &str, target: &ColumnDescriptor) -> String {
    match dialect {
        Dialect::MySql => modify(table, target),
        Dialect::Postgres if target.auto_increment => format!(
            "ALTER TABLE {table} ALTER COLUMN {} ADD GENERATED BY DEFAULT AS IDENTITY",
            target.name
        ),
        Dialect::Postgres => format!(
            "ALTER TABLE {table} ALTER COLUMN {} DROP IDENTITY",
            target.name
        ),
    }
}

pub fn set_default(table: &str, column: &str, literal: &str) -> String {
    format!("ALTER TABLE {table} ALTER COLUMN {column} SET DEFAULT {literal}")
}

/// Whether a reported default already equals `literal`.
///
/// Postgres reports defaults with a trailing cast (`'draft'::text`), lower-case
/// keywords (`true`) and its own number formatting, so unquoted literals compare
/// case-insensitively and numbers by value. Quoted text compares exactly.
pub fn same_default(reported: &str, literal: &str) -> bool {
    let reported = strip_cast(reported.trim());
    let literal = literal.trim();
    if reported == literal {
        return true;
    }
    if literal.starts_with('\'') {
        return false;
    }
    match (numeric(reported), literal.parse::<f64>()) {
        (Some(a), Ok(b)) => a == b,
        _ => !reported.starts_with('\'') && reported.eq_ignore_ascii_case(literal),
    }
}

fn strip_cast(expr: &str) -> &str {
    match expr.rsplit_once("::") {
        Some((head, tail)) if !tail.contains('\'') => strip_cast(head.trim_end()),
        _ => expr,
    }
}

/// A number, possibly quoted or parenthesized (`'-1'`, `(-1)`).
fn numeric(expr: &str) -> Option<f64> {
    let inner = expr
        .strip_prefix('(')
        .and_then(|e| e.strip_suffix(')'))
        .unwrap_or(expr);
    let inner = inner
        .strip_prefix('\'')
        .and_then(|e| e.strip_suffix('\''))
        .unwrap_or(inner);
    inner.parse().ok()
}

pub fn drop_default(table: &str, column: &str) -> String {
    format!("ALTER TABLE {table} ALTER COLUMN {column} DROP DEFAULT")
}

pub fn add_unique(table: &str, column: &str) -> String {
    format!(
        "ALTER TABLE {table} ADD CONSTRAINT {} UNIQUE ({column})",
        unique_name(table, column)
    )
}

pub fn drop_unique(dialect: Dialect, table: &str, column: &str) -> String {
    let name = unique_name(table, column);
    match dialect {
        Dialect::MySql => format!("ALTER TABLE {table} DROP INDEX {name}"),
        Dialect::Postgres => format!("ALTER TABLE {table} DROP CONSTRAINT {name}"),
    }
}

pub fn add_foreign_key(
    table: &str,
    column: &str,
    constraint: &str,
    ref_table: &str,
    ref_column: &str,
) -> String {
    format!(
        "ALTER TABLE {table} ADD CONSTRAINT {constraint} FOREIGN KEY ({column}) \
         REFERENCES {ref_table} ({ref_column})"
    )
}

pub fn drop_foreign_key(dialect: Dialect, table: &str, constraint: &str) -> String {
    match dialect {
        Dialect::MySql => format!("ALTER TABLE {table} DROP FOREIGN KEY {constraint}"),
        Dialect::Postgres => format!("ALTER TABLE {table} DROP CONSTRAINT {constraint}"),
    }
}

pub fn unique_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_key")
}

pub fn unsigned_check_name(table: &str, column: &str) -> String {
    format!("{table}_{column}_unsigned")
}

/// Deterministic foreign key name: `fk_<table>_<hash>`, where the hash covers the
/// whole (table, column, ref_table, ref_column) tuple.
pub fn foreign_key_name(table: &str, column: &str, ref_table: &str, ref_column: &str) -> String {
    let digest = blake3::hash(format!("{table}.{column}>{ref_table}.{ref_column}").as_bytes());
    let hex = digest.to_hex();
    let table_part: String = table.chars().take(40).collect();
    format!("fk_{table_part}_{}", &hex.as_str()[..10])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mysql_definition_carries_every_flag() {
        let mut col = ColumnDescriptor::new("id", "int").not_null();
        col.unsigned = true;
        col.auto_increment = true;
        assert_eq!(column_definition(&col), "int UNSIGNED NOT NULL AUTO_INCREMENT");

        let col = ColumnDescriptor::new("status", "varchar(20)").default_expr("'draft'");
        assert_eq!(column_definition(&col), "varchar(20) NULL DEFAULT 'draft'");
    }

    #[test]
    fn nullability_per_dialect() {
        let col = ColumnDescriptor::new("email", "varchar(255)").not_null();
        assert_eq!(
            set_nullable(Dialect::MySql, "users", &col),
            "ALTER TABLE users MODIFY COLUMN email varchar(255) NOT NULL"
        );
        assert_eq!(
            set_nullable(Dialect::Postgres, "users", &col),
            "ALTER TABLE users ALTER COLUMN email SET NOT NULL"
        );
    }

    #[test]
    fn foreign_key_name_is_stable_and_distinct() {
        let a = foreign_key_name("posts", "user_id", "users", "id");
        assert_eq!(a, foreign_key_name("posts", "user_id", "users", "id"));
        assert!(a.starts_with("fk_posts_"));
        assert_eq!(a.len(), "fk_posts_".len() + 10);
        // Same three-letter prefixes, different tuple.
        assert_ne!(a, foreign_key_name("posts", "use_id", "useverything", "id"));
    }

    #[test]
    fn postgres_unsigned_is_a_check() {
        let mut col = ColumnDescriptor::new("qty", "integer");
        col.unsigned = true;
        assert_eq!(
            set_unsigned(Dialect::Postgres, "items", &col),
            "ALTER TABLE items ADD CONSTRAINT items_qty_unsigned CHECK (qty >= 0)"
        );
        col.unsigned = false;
        assert_eq!(
            set_unsigned(Dialect::Postgres, "items", &col),
            "ALTER TABLE items DROP CONSTRAINT items_qty_unsigned"
        );
    }

    #[test]
    fn reported_defaults_ignore_casts() {
        assert!(same_default("'draft'", "'draft'"));
        assert!(same_default("'draft'::text", "'draft'"));
        assert!(same_default("'a::b'::character varying", "'a::b'"));
        assert!(!same_default("'drafts'::text", "'draft'"));
    }

    #[test]
    fn reported_defaults_normalize_keywords_and_numbers() {
        assert!(same_default("true", "TRUE"));
        assert!(same_default("false", "FALSE"));
        assert!(!same_default("false", "TRUE"));
        assert!(same_default("1.50", "1.5"));
        assert!(same_default("'-1'::integer", "-1"));
        assert!(same_default("(-1)", "-1"));
        assert!(same_default("'2.5'::numeric(10,2)", "2.5"));
        assert!(!same_default("'Draft'::text", "'draft'"));
        assert!(!same_default("'1'::text", "'1.0'"));
    }
}
