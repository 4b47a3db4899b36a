//! Generic client trait for unified database access.
//!
//! Builders only ever produce SQL with named `:key` placeholders plus a
//! [`Bindings`] map; a client is whatever can run that. The Postgres
//! implementations live in [`postgres`].

pub mod postgres;

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::row::Record;
use crate::schema::TableDescription;
use crate::statement::StatementKind;
use crate::value::{Bindings, Value};

/// Result of [`GenericClient::run`].
#[derive(Debug, Clone, PartialEq)]
pub enum Executed {
    /// The statement produced a result set.
    Rows(Vec<Record>),
    /// The statement changed rows (or nothing at all).
    Affected(u64),
}

/// A trait that unifies database clients and transactions.
///
/// This allows the builders to run on a plain connection, a pooled connection,
/// or inside a transaction.
pub trait GenericClient: Send + Sync {
    /// SQL dialect the connection speaks, used when the configuration names none.
    fn dialect(&self) -> Dialect {
        Dialect::MySql
    }

    /// Execute a query and return all rows.
    fn fetch(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> impl std::future::Future<Output = OrmResult<Vec<Record>>> + Send;

    /// Execute a statement and return the number of affected rows.
    fn execute(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> impl std::future::Future<Output = OrmResult<u64>> + Send;

    /// Identifier generated by the most recent INSERT on this connection.
    ///
    /// The default implementation reports none.
    fn last_insert_id(&self) -> impl std::future::Future<Output = OrmResult<Option<Value>>> + Send {
        async { Ok(None) }
    }

    /// Snapshot the columns of a table.
    fn describe_table(
        &self,
        table: &str,
    ) -> impl std::future::Future<Output = OrmResult<TableDescription>> + Send;

    /// Execute any statement, fetching rows for reads and counting rows otherwise.
    fn run(
        &self,
        sql: &str,
        bindings: &Bindings,
    ) -> impl std::future::Future<Output = OrmResult<Executed>> + Send {
        async move {
            if StatementKind::detect(sql).returns_rows() {
                Ok(Executed::Rows(self.fetch(sql, bindings).await?))
            } else {
                Ok(Executed::Affected(self.execute(sql, bindings).await?))
            }
        }
    }
}

impl<C: GenericClient> GenericClient for &C {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    async fn fetch(&self, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>> {
        (**self).fetch(sql, bindings).await
    }

    async fn execute(&self, sql: &str, bindings: &Bindings) -> OrmResult<u64> {
        (**self).execute(sql, bindings).await
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        (**self).last_insert_id().await
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        (**self).describe_table(table).await
    }
}

impl GenericClient for tokio_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch(&self, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>> {
        postgres::fetch(self, sql, bindings).await
    }

    async fn execute(&self, sql: &str, bindings: &Bindings) -> OrmResult<u64> {
        postgres::execute(self, sql, bindings).await
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        postgres::last_insert_id(self).await
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        postgres::describe_table(self, table).await
    }
}

// A failing lastval() would abort the transaction, so transactions keep the
// default `last_insert_id`. Inserts on Postgres use RETURNING instead.
impl GenericClient for tokio_postgres::Transaction<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch(&self, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>> {
        postgres::fetch(self, sql, bindings).await
    }

    async fn execute(&self, sql: &str, bindings: &Bindings) -> OrmResult<u64> {
        postgres::execute(self, sql, bindings).await
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        postgres::describe_table(self, table).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Client {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch(&self, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>> {
        let client: &tokio_postgres::Client = self;
        GenericClient::fetch(client, sql, bindings).await
    }

    async fn execute(&self, sql: &str, bindings: &Bindings) -> OrmResult<u64> {
        let client: &tokio_postgres::Client = self;
        GenericClient::execute(client, sql, bindings).await
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        let client: &tokio_postgres::Client = self;
        GenericClient::last_insert_id(client).await
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        let client: &tokio_postgres::Client = self;
        GenericClient::describe_table(client, table).await
    }
}

#[cfg(feature = "pool")]
impl GenericClient for deadpool_postgres::Transaction<'_> {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    async fn fetch(&self, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>> {
        GenericClient::fetch(&**self, sql, bindings).await
    }

    async fn execute(&self, sql: &str, bindings: &Bindings) -> OrmResult<u64> {
        GenericClient::execute(&**self, sql, bindings).await
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        GenericClient::describe_table(&**self, table).await
    }
}
