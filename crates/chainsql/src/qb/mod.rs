//! Chainable query builders.
//!
//! Every chain starts from a [`Db`](crate::Db) verb and owns its own
//! [`BuilderState`]. The verb that starts the chain fixes the statement kind:
//! `from()` gives a [`SelectQb`], `insert_into()`/`update()`/`delete_from()` give
//! the mutation builders, and the methods each builder offers only make sense
//! for that kind.
//!
//! Terminal verbs (`find_all`, `find`, `row`, `query`) consume the accumulated
//! state, leaving the chain empty.
//!
//! # Usage
//!
//! ```ignore
//! use chainsql::{Db, FilterQb};
//!
//! let db = Db::new(client);
//!
//! let posts = db
//!     .select("posts.title, users.name")
//!     .from("posts")?
//!     .left_join("users", "posts.user_id = users.id")?
//!     .where_("posts.status", "=", "published")?
//!     .order_by("posts.created_at", None)?
//!     .limit(0, Some(20))
//!     .find_all()
//!     .await?;
//!
//! db.insert_into("categories")?
//!     .values([("name", "JavaScript"), ("slug", "javascript")])?
//!     .query()
//!     .await?;
//! ```

pub mod compile;
mod delete;
mod insert;
mod select;
pub mod state;
mod traits;
mod update;


pub use compile::CompiledQuery;
pub use delete::DeleteQb;
pub use insert::InsertQb;
pub use select::{PendingSelect, SelectQb};
pub use state::{BuilderState, Direction, JoinKind, Limit, Operation};
pub use traits::{FilterQb, SqlQb};
pub use update::UpdateQb;

use crate::error::OrmResult;
use crate::ident;
use crate::row::Record;
use crate::value::Value;

/// Filter the column names of an INSERT/UPDATE payload.
fn payload<I, K, V>(values: I) -> OrmResult<Vec<(String, Value)>>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: Into<Value>,
{
    values
        .into_iter()
        .map(|(column, value)| Ok((ident::column(column.as_ref())?, value.into())))
        .collect()
}

/// Rows returned by [`SelectQb::find_all`].
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    /// Every matching row.
    Many(Vec<Record>),
    /// The chain was limited to a single row.
    One(Option<Record>),
}

impl Fetched {
    /// Flatten into a list of rows.
    pub fn into_rows(self) -> Vec<Record> {
        match self {
            Self::Many(rows) => rows,
            Self::One(row) => row.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Many(rows) => rows.len(),
            Self::One(row) => usize::from(row.is_some()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Result of a mutation chain's `query()`.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome {
    Inserted {
        affected: u64,
        last_insert_id: Option<Value>,
    },
    Affected(u64),
}

impl MutationOutcome {
    pub fn affected(&self) -> u64 {
        match self {
            Self::Inserted { affected, .. } | Self::Affected(affected) => *affected,
        }
    }

    pub fn last_insert_id(&self) -> Option<&Value> {
        match self {
            Self::Inserted { last_insert_id, .. } => last_insert_id.as_ref(),
            Self::Affected(_) => None,
        }
    }
}
