//! Accumulated builder state for one chain.
//!
//! A chain records everything here and the compiler turns it into SQL at the
//! terminal verb. The state is taken (and thereby reset) by every terminal verb.

use crate::error::{OrmError, OrmResult};
use crate::ident::ColumnRef;
use crate::value::{Bindings, Value};

/// The statement a chain compiles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

/// How a filter attaches to the filters before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

impl Connective {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }

    fn key_part(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
        }
    }
}

/// Join kinds, in the order the compiler emits them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
    Right,
    FullOuter,
}

impl JoinKind {
    pub const EMISSION_ORDER: [JoinKind; 4] =
        [JoinKind::Left, JoinKind::Inner, JoinKind::Right, JoinKind::FullOuter];

    /// Snake-case name of the join kind.
    pub fn name(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Inner => "inner",
            Self::Right => "right",
            Self::FullOuter => "full_outer",
        }
    }

    /// SQL keyword: the snake-case name with underscores as spaces, upper-cased.
    pub fn keyword(self) -> String {
        self.name().replace('_', " ").to_uppercase()
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Direction {
    Asc,
    #[default]
    Desc,
}

impl Direction {
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// A single bound value.
    Key(String),
    /// A list of bound values, OR'd together.
    Keys(Vec<String>),
    /// `IS NULL` / `IS NOT NULL`, no binding.
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub table: String,
    pub connective: Connective,
    pub column: String,
    pub operator: &'static str,
    pub operand: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub table: String,
    pub on: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Joins {
    pub inner: Vec<Join>,
    pub left: Vec<Join>,
    pub right: Vec<Join>,
    pub full_outer: Vec<Join>,
}

impl Joins {
    pub fn of(&self, kind: JoinKind) -> &[Join] {
        match kind {
            JoinKind::Inner => &self.inner,
            JoinKind::Left => &self.left,
            JoinKind::Right => &self.right,
            JoinKind::FullOuter => &self.full_outer,
        }
    }

    fn of_mut(&mut self, kind: JoinKind) -> &mut Vec<Join> {
        match kind {
            JoinKind::Inner => &mut self.inner,
            JoinKind::Left => &mut self.left,
            JoinKind::Right => &mut self.right,
            JoinKind::FullOuter => &mut self.full_outer,
        }
    }

    pub fn is_empty(&self) -> bool {
        JoinKind::EMISSION_ORDER
            .iter()
            .all(|kind| self.of(*kind).is_empty())
    }

    /// Joined tables in emission order.
    pub fn tables(&self) -> impl Iterator<Item = &str> {
        JoinKind::EMISSION_ORDER
            .into_iter()
            .flat_map(move |kind| self.of(kind).iter().map(|j| j.table.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub table: String,
    pub column: String,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupBy {
    pub table: String,
    pub column: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupConcat {
    pub expr: String,
    pub alias: String,
}

/// `LIMIT offset` or `LIMIT offset, count`.
///
/// A lone `offset` is the row count (MySQL semantics).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub count: Option<u64>,
}

impl Limit {
    /// The limit `find()` forces; a chain with exactly this limit returns a single row.
    pub const SINGLE: Limit = Limit {
        offset: 1,
        count: None,
    };
}

const OPERATORS: &[&str] = &[
    "=", "!=", "<>", "<", "<=", ">", ">=", "LIKE", "NOT LIKE", "IS", "IS NOT",
];

/// Check an operator against the allow-list and return its canonical spelling.
pub fn operator(op: &str) -> OrmResult<&'static str> {
    let normalized = op.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
    OPERATORS
        .iter()
        .copied()
        .find(|allowed| *allowed == normalized)
        .ok_or_else(|| OrmError::usage(format!("unsupported operator '{op}'")))
}

const SUFFIX_LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyz";

/// Keep ASCII letters only.
pub fn letters_only(s: &str) -> String {
    s.chars().filter(char::is_ascii_alphabetic).collect()
}

/// Everything one chain has accumulated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuilderState {
    pub(crate) table: Option<String>,
    pub(crate) operation: Option<Operation>,
    pub(crate) columns: Vec<(String, Vec<String>)>,
    pub(crate) filters: Vec<Filter>,
    pub(crate) joins: Joins,
    pub(crate) sort: Option<Sort>,
    pub(crate) group_by: Option<GroupBy>,
    pub(crate) group_concat: Vec<GroupConcat>,
    pub(crate) limit: Option<Limit>,
    pub(crate) payload: Vec<(String, Value)>,
    pub(crate) bindings: Bindings,
}

impl BuilderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    pub fn operation(&self) -> Option<Operation> {
        self.operation
    }

    /// Selected columns grouped by owning table, in insertion order.
    pub fn columns(&self) -> &[(String, Vec<String>)] {
        &self.columns
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn joins(&self) -> &Joins {
        &self.joins
    }

    pub fn sort(&self) -> Option<&Sort> {
        self.sort.as_ref()
    }

    pub fn limit(&self) -> Option<Limit> {
        self.limit
    }

    pub fn bindings(&self) -> &Bindings {
        &self.bindings
    }

    /// Whether more than one table takes part (every reference gets qualified).
    pub fn is_multi_table(&self) -> bool {
        self.columns.len() > 1
    }

    /// Set the active table and operation, registering the table for column tracking.
    pub(crate) fn target(&mut self, table: String, operation: Operation) {
        self.register_table(&table);
        self.table = Some(table);
        self.operation = Some(operation);
    }

    pub(crate) fn require_table(&self) -> OrmResult<&str> {
        self.table
            .as_deref()
            .ok_or_else(|| OrmError::usage("no table selected for this query"))
    }

    pub(crate) fn register_table(&mut self, table: &str) {
        if !self.columns.iter().any(|(t, _)| t == table) {
            self.columns.push((table.to_string(), Vec::new()));
        }
    }

    /// Record a selected column, resolving unqualified references to the active table.
    pub(crate) fn add_column(&mut self, column: ColumnRef) -> OrmResult<()> {
        let table = self.resolve_table(column.table)?;
        self.register_table(&table);
        if let Some((_, cols)) = self.columns.iter_mut().find(|(t, _)| *t == table) {
            if !cols.contains(&column.column) {
                cols.push(column.column);
            }
        }
        Ok(())
    }

    pub(crate) fn add_join(&mut self, kind: JoinKind, table: String, on: String) {
        self.register_table(&table);
        self.joins.of_mut(kind).push(Join { table, on });
    }

    pub(crate) fn set_sort(&mut self, column: ColumnRef, direction: Direction) -> OrmResult<()> {
        let table = self.resolve_table(column.table)?;
        self.sort = Some(Sort {
            table,
            column: column.column,
            direction,
        });
        Ok(())
    }

    pub(crate) fn set_group_by(&mut self, column: ColumnRef) -> OrmResult<()> {
        let table = self.resolve_table(column.table)?;
        self.group_by = Some(GroupBy {
            table,
            column: column.column,
        });
        Ok(())
    }

    pub(crate) fn add_group_concat(&mut self, expr: String, alias: String) {
        self.group_concat.push(GroupConcat { expr, alias });
    }

    pub(crate) fn set_limit(&mut self, offset: u64, count: Option<u64>) {
        self.limit = Some(Limit { offset, count });
    }

    /// Set (or extend) the INSERT/UPDATE payload. The `id` column is never accepted.
    pub(crate) fn set_payload(&mut self, payload: Vec<(String, Value)>) -> OrmResult<()> {
        for (column, value) in payload {
            if column == "id" {
                continue;
            }
            if value.is_list() {
                return Err(OrmError::usage(format!(
                    "column '{column}' cannot be assigned a list value"
                )));
            }
            match self.payload.iter_mut().find(|(c, _)| *c == column) {
                Some(slot) => slot.1 = value,
                None => self.payload.push((column, value)),
            }
        }
        Ok(())
    }

    /// Append a filter, deriving a unique bind key for each bound value.
    pub(crate) fn push_filter(
        &mut self,
        connective: Connective,
        column: ColumnRef,
        op: &str,
        value: Value,
    ) -> OrmResult<()> {
        let operator = operator(op)?;
        let table = self.resolve_table(column.table)?;
        let column = column.column;
        let base = format!("{}{}{}", table, connective.key_part(), column);

        let operand = match value {
            Value::Null if matches!(operator, "IS" | "IS NOT" | "=" | "!=" | "<>") => Operand::Null,
            _ if matches!(operator, "IS" | "IS NOT") => {
                return Err(OrmError::usage(format!(
                    "operator {operator} only accepts NULL"
                )));
            }
            Value::List(items) => {
                let mut keys = Vec::with_capacity(items.len());
                for item in items {
                    if item.is_list() {
                        return Err(OrmError::usage("nested list values are not supported"));
                    }
                    let key = self.bind(&format!("{base}{item}"), item);
                    keys.push(key);
                }
                Operand::Keys(keys)
            }
            scalar => Operand::Key(self.bind(&base, scalar)),
        };

        let operator = match (operator, &operand) {
            ("=" | "IS", Operand::Null) => "IS",
            ("!=" | "<>" | "IS NOT", Operand::Null) => "IS NOT",
            (op, _) => op,
        };

        self.filters.push(Filter {
            table,
            connective,
            column,
            operator,
            operand,
        });
        Ok(())
    }

    /// Derive a bind key from `seed` and bind `value` under it.
    ///
    /// The key keeps letters only; on collision a suffix letter is appended until
    /// the key is unused.
    pub(crate) fn bind(&mut self, seed: &str, value: Value) -> String {
        let mut key = letters_only(seed);
        if key.is_empty() {
            key.push('p');
        }
        let mut attempt = 0usize;
        while self.bindings.contains_key(&key) {
            key.push(char::from(SUFFIX_LETTERS[attempt % SUFFIX_LETTERS.len()]));
            attempt += 1;
        }
        self.bindings.insert(key.clone(), value);
        key
    }

    fn resolve_table(&self, table: Option<String>) -> OrmResult<String> {
        match table {
            Some(t) => Ok(t),
            None => self.require_table().map(str::to_string),
        }
    }
}
