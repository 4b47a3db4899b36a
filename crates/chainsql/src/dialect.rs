//! SQL dialect switches.
//!
//! The compiler speaks one grammar; the dialect only decides the handful of
//! fragments Postgres and MySQL spell differently.

use serde::Deserialize;
use std::str::FromStr;

use crate::error::OrmError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `LIMIT offset, count`, `GROUP_CONCAT`, `MODIFY COLUMN`.
    #[default]
    #[serde(alias = "mariadb")]
    MySql,
    /// `LIMIT count OFFSET offset`, `string_agg`, `ALTER COLUMN`.
    #[serde(alias = "postgresql", alias = "pg")]
    Postgres,
}

impl Dialect {
    pub fn name(self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
        }
    }

    /// Render a LIMIT clause.
    ///
    /// A lone first argument is the row count; with a count it is the offset,
    /// matching MySQL's `LIMIT offset, count`.
    pub fn limit(self, offset: u64, count: Option<u64>) -> String {
        match (self, count) {
            (_, None) => format!("LIMIT {offset}"),
            (Self::MySql, Some(count)) => format!("LIMIT {offset}, {count}"),
            (Self::Postgres, Some(count)) => format!("LIMIT {count} OFFSET {offset}"),
        }
    }

    /// Render a grouped string aggregation select item.
    pub fn group_concat(self, expr: &str, alias: &str) -> String {
        match self {
            Self::MySql => format!("GROUP_CONCAT({expr}) AS {alias}"),
            Self::Postgres => format!("string_agg(({expr})::text, ',') AS {alias}"),
        }
    }
}

impl FromStr for Dialect {
    type Err = OrmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Self::MySql),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(OrmError::usage(format!("unknown dialect '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limit_rendering() {
        assert_eq!(Dialect::MySql.limit(1, None), "LIMIT 1");
        assert_eq!(Dialect::MySql.limit(20, Some(10)), "LIMIT 20, 10");
        assert_eq!(Dialect::Postgres.limit(5, None), "LIMIT 5");
        assert_eq!(Dialect::Postgres.limit(20, Some(10)), "LIMIT 10 OFFSET 20");
    }

    #[test]
    fn group_concat_rendering() {
        assert_eq!(
            Dialect::MySql.group_concat("tags.name", "tag_names"),
            "GROUP_CONCAT(tags.name) AS tag_names"
        );
        assert_eq!(
            Dialect::Postgres.group_concat("tags.name", "tag_names"),
            "string_agg((tags.name)::text, ',') AS tag_names"
        );
    }

    #[test]
    fn parses_names() {
        assert_eq!("PostgreSQL".parse::<Dialect>().unwrap(), Dialect::Postgres);
        assert_eq!("mysql".parse::<Dialect>().unwrap(), Dialect::MySql);
        assert!("oracle".parse::<Dialect>().is_err());
    }
}
