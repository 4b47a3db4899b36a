use crate::client::GenericClient;
use crate::db::Db;
use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::qb::MutationOutcome;
use crate::qb::state::{BuilderState, Operation};
use crate::qb::traits::{FilterQb, SqlQb};

/// DELETE builder.
///
/// Without a filter every row of the table is deleted; that case is logged at
/// WARN level.
pub struct DeleteQb<'db, C> {
    db: &'db Db<C>,
    state: BuilderState,
}

impl<'db, C: GenericClient> DeleteQb<'db, C> {
    pub(crate) fn new(db: &'db Db<C>, table: String) -> Self {
        let mut state = BuilderState::new();
        state.target(table, Operation::Delete);
        Self { db, state }
    }

    /// Execute the DELETE and return the number of affected rows.
    pub async fn query(&mut self) -> OrmResult<MutationOutcome> {
        let state = std::mem::take(&mut self.state);
        self.db.run_mutation(state).await
    }
}

impl<C: GenericClient> SqlQb for DeleteQb<'_, C> {
    fn state(&self) -> &BuilderState {
        &self.state
    }

    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }
}

impl<C: GenericClient> FilterQb for DeleteQb<'_, C> {
    fn filter_target(&mut self) -> (&mut BuilderState, &str) {
        (&mut self.state, self.db.table_prefix())
    }
}
