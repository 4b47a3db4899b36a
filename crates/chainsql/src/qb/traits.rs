//! Trait definitions for query builders.

use crate::dialect::Dialect;
use crate::error::OrmResult;
use crate::ident::ColumnRef;
use crate::qb::compile::{self, CompiledQuery};
use crate::qb::state::{BuilderState, Connective};
use crate::value::Value;

/// Base trait for all query builders.
pub trait SqlQb {
    /// The accumulated state of this chain.
    fn state(&self) -> &BuilderState;

    /// Dialect the chain compiles for.
    fn dialect(&self) -> Dialect;

    /// Compile the chain without executing it.
    fn compile(&self) -> OrmResult<CompiledQuery> {
        compile::compile(self.state(), self.dialect())
    }

    /// Debug helper to get the SQL string.
    fn to_sql(&self) -> OrmResult<String> {
        self.compile().map(|q| q.sql)
    }
}

/// WHERE-clause verbs shared by SELECT, UPDATE and DELETE builders.
///
/// A [`Value::List`] operand becomes a parenthesized OR group, one bound term per
/// element; the verb's connective only decides how the group attaches to the
/// filters before it.
pub trait FilterQb: Sized {
    #[doc(hidden)]
    fn filter_target(&mut self) -> (&mut BuilderState, &str);

    /// Add a filter joined with AND.
    fn where_(&mut self, column: &str, op: &str, value: impl Into<Value>) -> OrmResult<&mut Self> {
        self.push_filter(Connective::And, column, op, value.into())
    }

    /// Same as [`where_`](FilterQb::where_).
    fn and_where(&mut self, column: &str, op: &str, value: impl Into<Value>) -> OrmResult<&mut Self> {
        self.push_filter(Connective::And, column, op, value.into())
    }

    /// Add a filter joined with OR.
    fn or_where(&mut self, column: &str, op: &str, value: impl Into<Value>) -> OrmResult<&mut Self> {
        self.push_filter(Connective::Or, column, op, value.into())
    }

    #[doc(hidden)]
    fn push_filter(
        &mut self,
        connective: Connective,
        column: &str,
        op: &str,
        value: Value,
    ) -> OrmResult<&mut Self> {
        let (state, prefix) = self.filter_target();
        let column = ColumnRef::parse(prefix, column)?;
        state.push_filter(connective, column, op, value)?;
        Ok(self)
    }
}
