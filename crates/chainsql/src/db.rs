//! The entry point: a client plus configuration and the result cache.

use crate::cache::QueryCache;
use crate::client::GenericClient;
use crate::config::DbConfig;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::qb::compile::{self, CompiledQuery};
use crate::qb::{
    BuilderState, DeleteQb, Fetched, InsertQb, Limit, MutationOutcome, Operation, PendingSelect,
    SelectQb, UpdateQb,
};
use crate::row::Record;
use crate::schema::{AlterSession, TableDescription};
use crate::statement::StatementKind;
use crate::value::{Bindings, Value};

/// Query and schema builder bound to one client.
///
/// Chains borrow the `Db`, so several chains can be built from it in turn; each
/// chain owns its own state.
///
/// ```ignore
/// let db = Db::with_config(client, DbConfig::from_env()?);
/// let user = db.from("users")?.find(7).await?;
/// ```
pub struct Db<C> {
    client: C,
    config: DbConfig,
    dialect: Dialect,
    cache: Option<QueryCache>,
}

impl<C: GenericClient> Db<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, DbConfig::default())
    }

    pub fn with_config(client: C, config: DbConfig) -> Self {
        let cache = config.cache_enabled.then(QueryCache::new);
        let dialect = config.dialect.unwrap_or_else(|| client.dialect());
        Self {
            client,
            config,
            dialect,
            cache,
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn into_client(self) -> C {
        self.client
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    /// The configured dialect, else the client's.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn table_prefix(&self) -> &str {
        &self.config.table_prefix
    }

    /// The result cache, when enabled.
    pub fn cache(&self) -> Option<&QueryCache> {
        self.cache.as_ref()
    }

    /// Pick columns, then the table: `db.select("a, b").from("t")`.
    pub fn select(&self, columns: &str) -> PendingSelect<'_, C> {
        PendingSelect::new(self, columns)
    }

    /// Start a SELECT chain on `table`.
    pub fn from(&self, table: &str) -> OrmResult<SelectQb<'_, C>> {
        Ok(SelectQb::new(self, self.table(table)?))
    }

    pub fn insert_into(&self, table: &str) -> OrmResult<InsertQb<'_, C>> {
        Ok(InsertQb::new(self, self.table(table)?))
    }

    pub fn update(&self, table: &str) -> OrmResult<UpdateQb<'_, C>> {
        Ok(UpdateQb::new(self, self.table(table)?))
    }

    pub fn delete_from(&self, table: &str) -> OrmResult<DeleteQb<'_, C>> {
        Ok(DeleteQb::new(self, self.table(table)?))
    }

    /// `CREATE TABLE name (col spec, ...)`.
    ///
    /// Column specs are inserted verbatim after screening for statement
    /// separators and comments.
    pub async fn create_table(&self, table: &str, columns: &[(&str, &str)]) -> OrmResult<u64> {
        if columns.is_empty() {
            return Err(OrmError::usage("CREATE TABLE requires at least one column"));
        }
        let table = self.table(table)?;
        let mut defs = Vec::with_capacity(columns.len());
        for (name, spec) in columns {
            let name = ident::column(name)?;
            let spec = ident::raw_fragment("column spec", spec)?;
            defs.push(format!("{name} {spec}"));
        }
        let sql = format!("CREATE TABLE {table} ({})", defs.join(", "));
        self.execute_ddl(&sql, &table).await
    }

    pub async fn drop_table(&self, table: &str) -> OrmResult<u64> {
        let table = self.table(table)?;
        self.execute_ddl(&format!("DROP TABLE {table}"), &table).await
    }

    pub async fn truncate_table(&self, table: &str) -> OrmResult<u64> {
        let table = self.table(table)?;
        self.execute_ddl(&format!("TRUNCATE TABLE {table}"), &table).await
    }

    /// Start an alter session on `table`, snapshotting its columns.
    pub async fn alter(&self, table: &str) -> OrmResult<AlterSession<'_, C>> {
        let table = self.table(table)?;
        AlterSession::begin(self, table).await
    }

    /// Fetch a fresh snapshot of `table`'s columns.
    pub async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        let table = self.table(table)?;
        self.client.describe_table(&table).await
    }

    /// Identifier generated by the last INSERT, as reported by the client.
    pub async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        self.client.last_insert_id().await
    }

    fn table(&self, name: &str) -> OrmResult<String> {
        ident::table(self.table_prefix(), name)
    }

    pub(crate) async fn run_select(&self, state: BuilderState) -> OrmResult<Fetched> {
        let single = state.limit() == Some(Limit::SINGLE);
        let compiled = compile::compile(&state, self.dialect())?;
        let rows = self.fetch_compiled(&compiled).await?;
        if single {
            Ok(Fetched::One(rows.into_iter().next()))
        } else {
            Ok(Fetched::Many(rows))
        }
    }

    pub(crate) async fn run_mutation(&self, state: BuilderState) -> OrmResult<MutationOutcome> {
        if !matches!(
            state.operation(),
            Some(Operation::Insert | Operation::Update | Operation::Delete)
        ) {
            return Err(OrmError::usage(
                "query() requires an INSERT, UPDATE or DELETE operation",
            ));
        }
        let compiled = compile::compile(&state, self.dialect())?;
        let table = compiled.tables[0].as_str();

        if !compiled.filtered && compiled.operation != Operation::Insert {
            tracing::warn!(
                target: "chainsql.sql",
                operation = ?compiled.operation,
                table,
                "statement has no WHERE clause and affects every row"
            );
        }

        let outcome = match compiled.operation {
            Operation::Insert if self.dialect() == Dialect::Postgres => {
                let rows = self.fetch_uncached(&compiled).await?;
                MutationOutcome::Inserted {
                    affected: rows.len() as u64,
                    last_insert_id: rows.first().and_then(|row| row.get("id")).cloned(),
                }
            }
            Operation::Insert => {
                let affected = self.execute_compiled(&compiled).await?;
                MutationOutcome::Inserted {
                    affected,
                    last_insert_id: self.client.last_insert_id().await?,
                }
            }
            _ => MutationOutcome::Affected(self.execute_compiled(&compiled).await?),
        };

        self.invalidate(table);
        Ok(outcome)
    }

    async fn fetch_compiled(&self, compiled: &CompiledQuery) -> OrmResult<Vec<Record>> {
        if let Some(rows) = self
            .cache
            .as_ref()
            .and_then(|cache| cache.get(&compiled.sql, &compiled.bindings))
        {
            return Ok(rows);
        }
        let rows = self.fetch_uncached(compiled).await?;
        if let Some(cache) = &self.cache {
            cache.put(&compiled.sql, &compiled.bindings, &compiled.tables, rows.clone());
        }
        Ok(rows)
    }

    async fn fetch_uncached(&self, compiled: &CompiledQuery) -> OrmResult<Vec<Record>> {
        log_statement(&compiled.sql, &compiled.bindings);
        self.client.fetch(&compiled.sql, &compiled.bindings).await
    }

    async fn execute_compiled(&self, compiled: &CompiledQuery) -> OrmResult<u64> {
        log_statement(&compiled.sql, &compiled.bindings);
        self.client.execute(&compiled.sql, &compiled.bindings).await
    }

    /// Run a schema statement against `table`, dropping its cached results.
    pub(crate) async fn execute_ddl(&self, sql: &str, table: &str) -> OrmResult<u64> {
        self.execute_raw(sql, &Bindings::new(), table).await
    }

    pub(crate) async fn execute_raw(&self, sql: &str, bindings: &Bindings, table: &str) -> OrmResult<u64> {
        log_statement(sql, bindings);
        let affected = self.client.execute(sql, bindings).await?;
        self.invalidate(table);
        Ok(affected)
    }

    fn invalidate(&self, table: &str) {
        if let Some(cache) = &self.cache {
            cache.clear(table);
        }
    }
}

fn log_statement(sql: &str, bindings: &Bindings) {
    tracing::debug!(
        target: "chainsql.sql",
        kind = ?StatementKind::detect(sql),
        params = bindings.len(),
        sql = %sql,
        "executing statement"
    );
}
