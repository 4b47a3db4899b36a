//! Fragment compiler: builder state in, SQL text and bindings out.
//!
//! Each clause is rendered by its own function so the pieces can be tested in
//! isolation. Empty clauses render as empty strings; the final statement has its
//! whitespace collapsed.

use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::qb::state::{BuilderState, Filter, JoinKind, Operand, Operation};
use crate::value::Bindings;

/// A compiled statement, ready for a client.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Bindings,
    pub operation: Operation,
    /// Tables the statement touches: the active table first, then joined tables.
    pub tables: Vec<String>,
    /// Whether a WHERE clause was emitted.
    pub filtered: bool,
}

/// Compile the state for its recorded operation.
pub fn compile(state: &BuilderState, dialect: Dialect) -> OrmResult<CompiledQuery> {
    let table = state.require_table()?;
    let operation = state
        .operation()
        .ok_or_else(|| OrmError::usage("no operation recorded for this query"))?;

    let sql = match operation {
        Operation::Select => select_statement(state, dialect, table),
        Operation::Insert => insert_statement(state, dialect, table)?,
        Operation::Update => update_statement(state, table)?,
        Operation::Delete => format!("DELETE FROM {table} {}", where_clause(state)),
    };

    let mut bindings = state.bindings().clone();
    if matches!(operation, Operation::Insert | Operation::Update) {
        bindings.extend(state.payload.iter().cloned().collect());
    }

    let mut tables = vec![table.to_string()];
    tables.extend(state.joins().tables().map(str::to_string));

    Ok(CompiledQuery {
        sql: collapse_whitespace(&sql),
        bindings,
        operation,
        tables,
        filtered: !state.filters().is_empty(),
    })
}

fn select_statement(state: &BuilderState, dialect: Dialect, table: &str) -> String {
    [
        format!("SELECT {} FROM {table}", select_list(state, dialect)),
        join_clause(state),
        where_clause(state),
        group_by_clause(state),
        order_by_clause(state),
        limit_clause(state, dialect),
    ]
    .join(" ")
}

fn insert_statement(state: &BuilderState, dialect: Dialect, table: &str) -> OrmResult<String> {
    if state.payload.is_empty() {
        return Err(OrmError::usage("INSERT requires at least one value"));
    }
    let columns: Vec<&str> = state.payload.iter().map(|(c, _)| c.as_str()).collect();
    let placeholders: Vec<String> = columns.iter().map(|c| format!(":{c}")).collect();
    let mut sql = format!(
        "INSERT INTO {table} ({}) VALUES ({})",
        columns.join(", "),
        placeholders.join(", ")
    );
    if dialect == Dialect::Postgres {
        sql.push_str(" RETURNING *");
    }
    Ok(sql)
}

fn update_statement(state: &BuilderState, table: &str) -> OrmResult<String> {
    if state.payload.is_empty() {
        return Err(OrmError::usage("UPDATE requires at least one assignment"));
    }
    let assignments: Vec<String> = state
        .payload
        .iter()
        .map(|(c, _)| format!("{c} = :{c}"))
        .collect();
    Ok(format!(
        "UPDATE {table} SET {} {}",
        assignments.join(", "),
        where_clause(state)
    ))
}

fn qualify(state: &BuilderState, table: &str, column: &str) -> String {
    if state.is_multi_table() {
        format!("{table}.{column}")
    } else {
        column.to_string()
    }
}

/// The SELECT list: tracked columns, or `*` when none were named, then aggregates.
pub fn select_list(state: &BuilderState, dialect: Dialect) -> String {
    let mut items: Vec<String> = state
        .columns()
        .iter()
        .flat_map(|(table, cols)| cols.iter().map(move |c| qualify(state, table, c)))
        .collect();
    if items.is_empty() {
        items.push("*".to_string());
    }
    items.extend(
        state
            .group_concat
            .iter()
            .map(|g| dialect.group_concat(&g.expr, &g.alias)),
    );
    items.join(", ")
}

/// All joins, LEFT first, then INNER, RIGHT and FULL OUTER.
pub fn join_clause(state: &BuilderState) -> String {
    JoinKind::EMISSION_ORDER
        .into_iter()
        .flat_map(|kind| {
            state
                .joins()
                .of(kind)
                .iter()
                .map(move |j| format!("{} JOIN {} ON {}", kind.keyword(), j.table, j.on))
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn where_clause(state: &BuilderState) -> String {
    if state.filters().is_empty() {
        return String::new();
    }
    let mut sql = String::from("WHERE");
    for (i, filter) in state.filters().iter().enumerate() {
        if i > 0 {
            sql.push(' ');
            sql.push_str(filter.connective.keyword());
        }
        sql.push(' ');
        sql.push_str(&filter_term(state, filter));
    }
    sql
}

fn filter_term(state: &BuilderState, filter: &Filter) -> String {
    let column = qualify(state, &filter.table, &filter.column);
    match &filter.operand {
        Operand::Key(key) => format!("{column} {} :{key}", filter.operator),
        Operand::Null => format!("{column} {} NULL", filter.operator),
        Operand::Keys(keys) if keys.is_empty() => "(1=0)".to_string(),
        Operand::Keys(keys) => {
            let terms: Vec<String> = keys
                .iter()
                .map(|key| format!("{column} {} :{key}", filter.operator))
                .collect();
            format!("({})", terms.join(" OR "))
        }
    }
}

pub fn group_by_clause(state: &BuilderState) -> String {
    match &state.group_by {
        Some(g) => format!("GROUP BY {}", qualify(state, &g.table, &g.column)),
        None => String::new(),
    }
}

pub fn order_by_clause(state: &BuilderState) -> String {
    match state.sort() {
        Some(s) => format!(
            "ORDER BY {} {}",
            qualify(state, &s.table, &s.column),
            s.direction.keyword()
        ),
        None => String::new(),
    }
}

pub fn limit_clause(state: &BuilderState, dialect: Dialect) -> String {
    match state.limit() {
        Some(limit) => dialect.limit(limit.offset, limit.count),
        None => String::new(),
    }
}

pub(crate) fn collapse_whitespace(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}
