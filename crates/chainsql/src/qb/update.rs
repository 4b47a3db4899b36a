use crate::client::GenericClient;
use crate::db::Db;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::qb::MutationOutcome;
use crate::qb::state::{BuilderState, Operation};
use crate::qb::traits::{FilterQb, SqlQb};
use crate::value::Value;

/// UPDATE builder.
pub struct UpdateQb<'db, C> {
    db: &'db Db<C>,
    state: BuilderState,
}

impl<'db, C: GenericClient> UpdateQb<'db, C> {
    pub(crate) fn new(db: &'db Db<C>, table: String) -> Self {
        let mut state = BuilderState::new();
        state.target(table, Operation::Update);
        Self { db, state }
    }

    /// Columns to assign. An `id` entry is ignored.
    pub fn set<I, K, V>(&mut self, values: I) -> OrmResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let payload = super::payload(values)?;
        self.state.set_payload(payload)?;
        Ok(self)
    }

    /// Execute the UPDATE and return the number of affected rows.
    pub async fn query(&mut self) -> OrmResult<MutationOutcome> {
        let state = std::mem::take(&mut self.state);
        self.db.run_mutation(state).await
    }
}

impl<C: GenericClient> SqlQb for UpdateQb<'_, C> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }
}

impl<C: GenericClient> FilterQb for UpdateQb<'_, C> {
    fn filter_target(&mut self) -> (&mut BuilderState, &str) {
        (&mut self.state, self.db.table_prefix())
    }
}
