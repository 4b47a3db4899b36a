use crate::client::GenericClient;
use crate::db::Db;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::qb::MutationOutcome;
use crate::qb::state::{BuilderState, Operation};
use crate::qb::traits::SqlQb;
use crate::value::Value;

/// INSERT builder.
pub struct InsertQb<'db, C> {
    db: &'db Db<C>,
    state: BuilderState,
}

impl<'db, C: GenericClient> InsertQb<'db, C> {
    pub(crate) fn new(db: &'db Db<C>, table: String) -> Self {
        let mut state = BuilderState::new();
        state.target(table, Operation::Insert);
        Self { db, state }
    }

    /// Column values to insert. An `id` entry is ignored.
    pub fn values<I, K, V>(&mut self, values: I) -> OrmResult<&mut Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<Value>,
    {
        let payload = super::payload(values)?;
        self.state.set_payload(payload)?;
        Ok(self)
    }

    /// Execute the INSERT.
    pub async fn query(&mut self) -> OrmResult<MutationOutcome> {
        let state = std::mem::take(&mut self.state);
        self.db.run_mutation(state).await
    }
}

impl<C: GenericClient> SqlQb for InsertQb<'_, C> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }
}
