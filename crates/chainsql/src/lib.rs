//! # chainsql
//!
//! A chainable SQL query and schema builder.
//!
//! ## Features
//!
//! - **Chainable builders**: pick a table, add filters, joins, ordering and limits, then run
//! - **Named bind parameters**: values never touch the SQL text; keys are derived and kept unique per chain
//! - **Join-aware**: column references are table-qualified as soon as a second table takes part
//! - **Strict identifiers**: table and column names must match `[a-z_][a-z0-9_]*` after normalization
//! - **Alter sessions**: idempotent column and constraint changes against a live table snapshot
//! - **Result cache**: optional per-`Db` cache for SELECT results, invalidated by writes
//!
//! ## Usage
//!
//! ```ignore
//! use chainsql::{Db, DbConfig, FilterQb, Fetched};
//!
//! let db = Db::with_config(client, DbConfig::new().table_prefix("app_"));
//!
//! // SELECT ... WHERE (email = :k1 OR email = :k2)
//! let users = db
//!     .from("users")?
//!     .where_("email", "=", vec!["x@a.com", "y@b.com"])?
//!     .find_all()
//!     .await?;
//!
//! // Single row by id
//! let user = db.from("users")?.find(7).await?;
//!
//! // INSERT
//! let outcome = db
//!     .insert_into("categories")?
//!     .values([("name", "JavaScript"), ("slug", "javascript")])?
//!     .query()
//!     .await?;
//!
//! // UPDATE
//! db.update("users")?
//!     .set([("status", "inactive")])?
//!     .where_("id", "=", 7)?
//!     .query()
//!     .await?;
//! ```

pub mod cache;
pub mod client;
pub mod config;
pub mod db;
pub mod dialect;
pub mod error;
pub mod ident;
pub mod qb;
pub mod row;
pub mod schema;
pub mod statement;
pub mod value;

#[cfg(test)]
mod testing;

pub use cache::QueryCache;
pub use client::{Executed, GenericClient};
pub use config::DbConfig;
pub use db::Db;
pub use dialect::Dialect;
pub use error::{OrmError, OrmResult};
pub use qb::{
    BuilderState, CompiledQuery, DeleteQb, Direction, Fetched, FilterQb, InsertQb, JoinKind,
    MutationOutcome, PendingSelect, SelectQb, SqlQb, UpdateQb,
};
pub use row::{FromValue, Record};
pub use schema::{AlterSession, ColumnDescriptor, ForeignKeyRef, TableDescription};
pub use statement::StatementKind;
pub use value::{Bindings, Value};

// Connection pool (optional)
#[cfg(feature = "pool")]
pub mod pool;

#[cfg(feature = "pool")]
pub use pool::{checkout, create_pool, create_pool_with_config};
