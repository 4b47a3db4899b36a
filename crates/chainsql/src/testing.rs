//! Recording client for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::client::GenericClient;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::row::Record;
use crate::schema::TableDescription;
use crate::value::{Bindings, Value};

/// Records every statement and answers from scripted responses.
///
/// `fetch` pops queued row sets (empty when none are left). `describe_table`
/// pops queued snapshots but keeps returning the last one once a single entry
/// remains.
#[derive(Default)]
pub(crate) struct RecordingClient {
    log: Mutex<Vec<(String, Bindings)>>,
    rows: Mutex<VecDeque<Vec<Record>>>,
    snapshots: Mutex<VecDeque<TableDescription>>,
    affected: u64,
    last_id: Option<Value>,
    dialect: Dialect,
}

impl RecordingClient {
    pub fn new() -> Self {
        Self {
            affected: 1,
            ..Self::default()
        }
    }

    pub fn with_rows(self, rows: Vec<Record>) -> Self {
        self.rows.lock().unwrap().push_back(rows);
        self
    }

    pub fn with_snapshot(self, snapshot: TableDescription) -> Self {
        self.snapshots.lock().unwrap().push_back(snapshot);
        self
    }

    /// Report `dialect` as the connection's own.
    pub fn with_dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn with_last_id(mut self, id: impl Into<Value>) -> Self {
        self.last_id = Some(id.into());
        self
    }

    pub fn calls(&self) -> Vec<(String, Bindings)> {
        self.log.lock().unwrap().clone()
    }

    pub fn statements(&self) -> Vec<String> {
        self.calls().into_iter().map(|(sql, _)| sql).collect()
    }

    fn record(&self, sql: &str, bindings: &Bindings) {
        self.log
            .lock()
            .unwrap()
            .push((sql.to_string(), bindings.clone()));
    }
}

impl GenericClient for RecordingClient {
    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn fetch(&self, sql: &str, bindings: &Bindings) -> OrmResult<Vec<Record>> {
        self.record(sql, bindings);
        Ok(self.rows.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, sql: &str, bindings: &Bindings) -> OrmResult<u64> {
        self.record(sql, bindings);
        Ok(self.affected)
    }

    async fn last_insert_id(&self) -> OrmResult<Option<Value>> {
        Ok(self.last_id.clone())
    }

    async fn describe_table(&self, table: &str) -> OrmResult<TableDescription> {
        let mut snapshots = self.snapshots.lock().unwrap();
        let snapshot = if snapshots.len() > 1 {
            snapshots.pop_front()
        } else {
            snapshots.front().cloned()
        };
        snapshot.ok_or_else(|| OrmError::usage(format!("table '{table}' does not exist")))
    }
}
