use crate::client::GenericClient;
use crate::db::Db;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::ident::{self, ColumnRef};
use crate::qb::Fetched;
use crate::qb::state::{BuilderState, Direction, JoinKind, Limit, Operation};
use crate::qb::traits::{FilterQb, SqlQb};
use crate::row::Record;
use crate::value::Value;

/// Columns chosen before the table: `db.select("a, b").from("t")`.
#[must_use = "call .from(table) to start the query"]
pub struct PendingSelect<'db, C> {
    db: &'db Db<C>,
    columns: String,
}

impl<'db, C: GenericClient> PendingSelect<'db, C> {
    pub(crate) fn new(db: &'db Db<C>, columns: &str) -> Self {
        Self {
            db,
            columns: columns.to_string(),
        }
    }

    pub fn from(self, table: &str) -> OrmResult<SelectQb<'db, C>> {
        let mut qb = self.db.from(table)?;
        qb.select(&self.columns)?;
        Ok(qb)
    }
}

/// SELECT builder.
pub struct SelectQb<'db, C> {
    db: &'db Db<C>,
    state: BuilderState,
}

impl<'db, C: GenericClient> SelectQb<'db, C> {
    pub(crate) fn new(db: &'db Db<C>, table: String) -> Self {
        let mut state = BuilderState::new();
        state.target(table, Operation::Select);
        Self { db, state }
    }

    /// Add columns from a comma-separated list. `table.column` entries are
    /// tracked under their own table.
    pub fn select(&mut self, columns: &str) -> OrmResult<&mut Self> {
        for item in ident::split_list(columns) {
            let column = ColumnRef::parse(self.db.table_prefix(), item)?;
            self.state.add_column(column)?;
        }
        Ok(self)
    }

    /// Alias of [`inner_join`](Self::inner_join).
    pub fn join(&mut self, table: &str, on: &str) -> OrmResult<&mut Self> {
        self.add_join(JoinKind::Inner, table, on)
    }

    pub fn inner_join(&mut self, table: &str, on: &str) -> OrmResult<&mut Self> {
        self.add_join(JoinKind::Inner, table, on)
    }

    pub fn left_join(&mut self, table: &str, on: &str) -> OrmResult<&mut Self> {
        self.add_join(JoinKind::Left, table, on)
    }

    pub fn right_join(&mut self, table: &str, on: &str) -> OrmResult<&mut Self> {
        self.add_join(JoinKind::Right, table, on)
    }

    pub fn full_outer_join(&mut self, table: &str, on: &str) -> OrmResult<&mut Self> {
        self.add_join(JoinKind::FullOuter, table, on)
    }

    fn add_join(&mut self, kind: JoinKind, table: &str, on: &str) -> OrmResult<&mut Self> {
        let table = ident::table(self.db.table_prefix(), table)?;
        let on = ident::raw_fragment("join condition", on)?;
        self.state.add_join(kind, table, on);
        Ok(self)
    }

    /// Sort by one column; `None` means descending. A later call replaces an
    /// earlier one.
    pub fn order_by(&mut self, column: &str, direction: Option<Direction>) -> OrmResult<&mut Self> {
        let column = ColumnRef::parse(self.db.table_prefix(), column)?;
        self.state.set_sort(column, direction.unwrap_or_default())?;
        Ok(self)
    }

    pub fn group_by(&mut self, column: &str) -> OrmResult<&mut Self> {
        let column = ColumnRef::parse(self.db.table_prefix(), column)?;
        self.state.set_group_by(column)?;
        Ok(self)
    }

    /// Add a `GROUP_CONCAT(expr) AS alias` select item.
    pub fn group_concat(&mut self, expr: &str, alias: &str) -> OrmResult<&mut Self> {
        let expr = ident::raw_fragment("group_concat expression", expr)?;
        let alias = ident::column(alias)?;
        self.state.add_group_concat(expr, alias);
        Ok(self)
    }

    /// `LIMIT offset` or `LIMIT offset, count`.
    pub fn limit(&mut self, offset: u64, count: Option<u64>) -> &mut Self {
        self.state.set_limit(offset, count);
        self
    }

    /// Run the query.
    ///
    /// Returns [`Fetched::One`] when the chain was limited to exactly one row,
    /// [`Fetched::Many`] otherwise.
    pub async fn find_all(&mut self) -> OrmResult<Fetched> {
        let state = std::mem::take(&mut self.state);
        self.db.run_select(state).await
    }

    /// Fetch one row, filtered by `id` unless `id` is NULL.
    pub async fn find(&mut self, id: impl Into<Value>) -> OrmResult<Option<Record>> {
        let id = id.into();
        if !id.is_null() {
            self.and_where("id", "=", id)?;
        }
        self.state.set_limit(Limit::SINGLE.offset, Limit::SINGLE.count);
        match self.find_all().await? {
            Fetched::One(row) => Ok(row),
            Fetched::Many(rows) => Ok(rows.into_iter().next()),
        }
    }

    /// Fetch the first matching row.
    pub async fn row(&mut self) -> OrmResult<Option<Record>> {
        self.find(Value::Null).await
    }
}

impl<C: GenericClient> SqlQb for SelectQb<'_, C> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }
}

impl<C: GenericClient> FilterQb for SelectQb<'_, C> {
    fn filter_target(&mut self) -> (&mut BuilderState, &str) {
        (&mut self.state, self.db.table_prefix())
    }
}
