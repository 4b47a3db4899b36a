use crate::client::GenericClient;
use crate::db::Db;
use crate::dialect::Dialect;
use crate::error::{OrmError, OrmResult};
use crate::ident;
use crate::schema::{ColumnDescriptor, TableDescription, ddl};
use crate::value::{Bindings, Value};

/// Structural changes to one table.
///
/// The session holds a snapshot of the table's columns taken when it starts and
/// refreshed after every statement it runs. Constraint verbs act on the *active
/// column*, chosen with [`modify_column`](Self::modify_column), and do nothing
/// when the snapshot shows the requested state already holds.
///
/// ```ignore
/// db.alter("users")
///     .await?
///     .add_column("nickname", "varchar(64)")
///     .await?
///     .modify_column("email", None)
///     .await?
///     .add_not_null(Some("unknown@example.com".into()))
///     .await?
///     .add_unique()
///     .await?;
/// ```
///
/// There is no rollback: a failing statement leaves the earlier ones applied.
pub struct AlterSession<'db, C> {
    db: &'db Db<C>,
    table: String,
    columns: TableDescription,
    active_column: Option<String>,
}

impl<'db, C: GenericClient> AlterSession<'db, C> {
    pub(crate) async fn begin(db: &'db Db<C>, table: String) -> OrmResult<Self> {
        let columns = db.client().describe_table(&table).await?;
        Ok(Self {
            db,
            table,
            columns,
            active_column: None,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The current column snapshot.
    pub fn columns(&self) -> &TableDescription {
        &self.columns
    }

    pub fn active_column(&self) -> Option<&str> {
        self.active_column.as_deref()
    }

    fn dialect(&self) -> Dialect {
        self.db.dialect()
    }

    pub async fn add_column(&mut self, name: &str, spec: &str) -> OrmResult<&mut Self> {
        let name = ident::column(name)?;
        let spec = ident::raw_fragment("column spec", spec)?;
        if self.columns.column(&name).is_some() {
            return Err(OrmError::usage(format!(
                "column '{name}' already exists in '{}'",
                self.table
            )));
        }
        let sql = ddl::add_column(self.dialect(), &self.table, &name, &spec);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn drop_column(&mut self, name: &str) -> OrmResult<&mut Self> {
        let name = self.existing(name)?;
        let sql = ddl::drop_column(&self.table, &name);
        self.apply(&sql).await?;
        if self.active_column.as_deref() == Some(name.as_str()) {
            self.active_column = None;
        }
        Ok(self)
    }

    /// Make `name` the active column; with a spec, also change its type.
    pub async fn modify_column(&mut self, name: &str, spec: Option<&str>) -> OrmResult<&mut Self> {
        let name = self.existing(name)?;
        self.active_column = Some(name.clone());
        if let Some(spec) = spec {
            let spec = ident::raw_fragment("column spec", spec)?;
            let sql = ddl::modify_column(self.dialect(), &self.table, &name, &spec);
            self.apply(&sql).await?;
        }
        Ok(self)
    }

    pub async fn add_primary_key(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if column.primary_key {
            return Ok(self.unchanged("add_primary_key", &column.name));
        }
        let sql = ddl::add_primary_key(&self.table, &column.name);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn drop_primary_key(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if !column.primary_key {
            return Ok(self.unchanged("drop_primary_key", &column.name));
        }
        self.demote_primary_key().await?;
        Ok(self)
    }

    /// Add NOT NULL, first back-filling NULLs with `default` when given.
    pub async fn add_not_null(&mut self, default: Option<Value>) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if !column.nullable {
            return Ok(self.unchanged("add_not_null", &column.name));
        }
        if let Some(value) = default {
            let sql = format!(
                "UPDATE {table} SET {col} = :backfill WHERE {col} IS NULL",
                table = self.table,
                col = column.name
            );
            let bindings: Bindings = [("backfill", value)].into_iter().collect();
            self.db.execute_raw(&sql, &bindings, &self.table).await?;
        }
        let target = ColumnDescriptor {
            nullable: false,
            ..column
        };
        let sql = ddl::set_nullable(self.dialect(), &self.table, &target);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn drop_not_null(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if column.nullable {
            return Ok(self.unchanged("drop_not_null", &column.name));
        }
        let target = ColumnDescriptor {
            nullable: true,
            ..column
        };
        let sql = ddl::set_nullable(self.dialect(), &self.table, &target);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn add_unsigned(&mut self) -> OrmResult<&mut Self> {
        self.set_unsigned(true).await
    }

    pub async fn drop_unsigned(&mut self) -> OrmResult<&mut Self> {
        self.set_unsigned(false).await
    }

    async fn set_unsigned(&mut self, unsigned: bool) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if column.unsigned == unsigned {
            let verb = if unsigned { "add_unsigned" } else { "drop_unsigned" };
            return Ok(self.unchanged(verb, &column.name));
        }
        let target = ColumnDescriptor { unsigned, ..column };
        let sql = ddl::set_unsigned(self.dialect(), &self.table, &target);
        self.apply(&sql).await?;
        Ok(self)
    }

    /// Make the active column auto-incrementing.
    ///
    /// Auto-increment needs the column to be the primary key: if it is not, any
    /// existing primary key is dropped and the column becomes the key first.
    pub async fn add_auto_increment(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if column.auto_increment {
            return Ok(self.unchanged("add_auto_increment", &column.name));
        }
        if !column.primary_key {
            if self.columns.primary_key().is_some() {
                self.demote_primary_key().await?;
            }
            let sql = ddl::add_primary_key(&self.table, &column.name);
            self.apply(&sql).await?;
        }
        let column = self.active()?.clone();
        let target = ColumnDescriptor {
            auto_increment: true,
            nullable: false,
            ..column
        };
        let sql = ddl::set_auto_increment(self.dialect(), &self.table, &target);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn drop_auto_increment(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if !column.auto_increment {
            return Ok(self.unchanged("drop_auto_increment", &column.name));
        }
        let target = ColumnDescriptor {
            auto_increment: false,
            ..column
        };
        let sql = ddl::set_auto_increment(self.dialect(), &self.table, &target);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn set_default(&mut self, value: impl Into<Value>) -> OrmResult<&mut Self> {
        let literal = value.into().to_sql_literal();
        let column = self.active()?.clone();
        if column
            .default
            .as_deref()
            .is_some_and(|reported| ddl::same_default(reported, &literal))
        {
            return Ok(self.unchanged("set_default", &column.name));
        }
        let sql = ddl::set_default(&self.table, &column.name, &literal);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn drop_default(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if column.default.is_none() {
            return Ok(self.unchanged("drop_default", &column.name));
        }
        let sql = ddl::drop_default(&self.table, &column.name);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn add_unique(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if column.unique || column.primary_key {
            return Ok(self.unchanged("add_unique", &column.name));
        }
        let sql = ddl::add_unique(&self.table, &column.name);
        self.apply(&sql).await?;
        Ok(self)
    }

    pub async fn drop_unique(&mut self) -> OrmResult<&mut Self> {
        let column = self.active()?.clone();
        if !column.unique {
            return Ok(self.unchanged("drop_unique", &column.name));
        }
        let sql = ddl::drop_unique(self.dialect(), &self.table, &column.name);
        self.apply(&sql).await?;
        Ok(self)
    }

    /// Reference `ref_table.ref_column` from the active column.
    ///
    /// Without a name the constraint is called `fk_<table>_<hash>`, hashed over
    /// both ends of the reference.
    pub async fn add_foreign_key(
        &mut self,
        ref_table: &str,
        ref_column: &str,
        name: Option<&str>,
    ) -> OrmResult<&mut Self> {
        let ref_table = ident::table(self.db.table_prefix(), ref_table)?;
        let ref_column = ident::column(ref_column)?;
        let column = self.active()?.clone();
        if let Some(fk) = &column.foreign_key {
            if fk.table == ref_table && fk.column == ref_column {
                return Ok(self.unchanged("add_foreign_key", &column.name));
            }
        }
        let constraint = match name {
            Some(name) => ident::column(name)?,
            None => ddl::foreign_key_name(&self.table, &column.name, &ref_table, &ref_column),
        };
        let sql = ddl::add_foreign_key(&self.table, &column.name, &constraint, &ref_table, &ref_column);
        self.apply(&sql).await?;
        Ok(self)
    }

    /// Drop the active column's foreign key to `ref_table.ref_column`.
    ///
    /// A key referencing anything else is left alone. The constraint is found by `name`, else as reported by the snapshot,
    /// else by the generated name for the reference.
    pub async fn drop_foreign_key(
        &mut self,
        ref_table: &str,
        ref_column: &str,
        name: Option<&str>,
    ) -> OrmResult<&mut Self> {
        let ref_table = ident::table(self.db.table_prefix(), ref_table)?;
        let ref_column = ident::column(ref_column)?;
        let column = self.active()?.clone();
        let Some(fk) = column
            .foreign_key
            .as_ref()
            .filter(|fk| fk.table == ref_table && fk.column == ref_column)
        else {
            return Ok(self.unchanged("drop_foreign_key", &column.name));
        };
        let constraint = match name {
            Some(name) => ident::column(name)?,
            None if !fk.constraint.is_empty() => fk.constraint.clone(),
            None => ddl::foreign_key_name(&self.table, &column.name, &ref_table, &ref_column),
        };
        let sql = ddl::drop_foreign_key(self.dialect(), &self.table, &constraint);
        self.apply(&sql).await?;
        Ok(self)
    }

    async fn demote_primary_key(&mut self) -> OrmResult<()> {
        let sql = ddl::drop_primary_key(
            self.dialect(),
            &self.table,
            self.columns.primary_key_constraint.as_deref(),
        );
        self.apply(&sql).await
    }

    /// Run one DDL statement and refresh the snapshot.
    async fn apply(&mut self, sql: &str) -> OrmResult<()> {
        tracing::info!(target: "chainsql.alter", table = %self.table, sql = %sql, "altering table");
        self.db.execute_ddl(sql, &self.table).await?;
        self.columns = self.db.client().describe_table(&self.table).await?;
        Ok(())
    }

    fn unchanged(&mut self, verb: &str, column: &str) -> &mut Self {
        tracing::debug!(target: "chainsql.alter", table = %self.table, column, verb, "already in requested state");
        self
    }

    fn existing(&self, name: &str) -> OrmResult<String> {
        let name = ident::column(name)?;
        if self.columns.column(&name).is_none() {
            return Err(OrmError::usage(format!(
                "column '{name}' does not exist in '{}'",
                self.table
            )));
        }
        Ok(name)
    }

    /// Live descriptor of the active column.
    fn active(&self) -> OrmResult<&ColumnDescriptor> {
        let name = self.active_column.as_deref().ok_or_else(|| {
            OrmError::usage("no active column; call modify_column(name, None) first")
        })?;
        self.columns.column(name).ok_or_else(|| {
            OrmError::usage(format!(
                "active column '{name}' no longer exists in '{}'",
                self.table
            ))
        })
    }
}
