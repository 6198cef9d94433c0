//! # Statement Module
//!
//! Builds parameterized DDL and DML text. Names enter only as validated
//! [`Identifier`]s; values enter only as [`Binding`]s that travel beside the
//! text and are bound positionally at execution time.

// ============================================================================
// External Crate Imports
// ============================================================================

use sqlx::any::AnyArguments;
use std::fmt;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    database::Drivers,
    identifier::{Identifier, ValidColumn},
    schema::ColumnType,
    value::Value,
};

// ============================================================================
// Statement Structs
// ============================================================================

/// A value bound to one placeholder, keyed `p0`, `p1`, ... (`id` for the row key).
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
}

/// Statement text plus its ordered bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    sql: String,
    bindings: Vec<Binding>,
}

impl Statement {
    fn new(sql: String) -> Self {
        Self { sql, bindings: Vec::new() }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Positional arguments in binding order.
    pub fn arguments(&self) -> Result<AnyArguments<'_>, sqlx::Error> {
        let mut args = AnyArguments::default();
        for binding in &self.bindings {
            binding.value.bind(&mut args)?;
        }
        Ok(args)
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} bound]", self.sql, self.bindings.len())
    }
}

/// A resolved column together with its abstract type, when the catalog type
/// maps to one.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedColumn {
    pub name: Identifier,
    pub column_type: Option<ColumnType>,
}

impl TypedColumn {
    pub fn new(name: Identifier, column_type: Option<ColumnType>) -> Self {
        Self { name, column_type }
    }
}

/// PostgreSQL infers a placeholder's type from the bound value, and there is
/// no implicit cast from `text` to the other column types.
fn postgres_cast(column_type: Option<ColumnType>, value: &Value) -> Option<&'static str> {
    match (column_type, value) {
        (Some(ColumnType::String), _) => None,
        (_, Value::Timestamp(_)) => Some("TIMESTAMP"),
        (Some(ColumnType::Int), Value::Text(_) | Value::Null) => Some("INTEGER"),
        (Some(ColumnType::Bool), Value::Text(_) | Value::Null) => Some("BOOLEAN"),
        (Some(ColumnType::Double), Value::Text(_) | Value::Null) => Some("DOUBLE PRECISION"),
        (Some(ColumnType::DateTime), Value::Text(_) | Value::Null) => Some("TIMESTAMP"),
        _ => None,
    }
}

/// Collects bindings while statement text is assembled.
struct Params {
    driver: Drivers,
    bindings: Vec<Binding>,
}

impl Params {
    fn new(driver: Drivers) -> Self {
        Self { driver, bindings: Vec::new() }
    }

    /// Binds `value` for a column of `column_type` under `p<n>` and returns
    /// its placeholder text.
    fn push(&mut self, column_type: Option<ColumnType>, value: &Value) -> String {
        let name = format!("p{}", self.bindings.len());
        self.push_named(name, column_type, value)
    }

    fn push_named(&mut self, name: String, column_type: Option<ColumnType>, value: &Value) -> String {
        self.bindings.push(Binding { name, value: value.clone() });
        let placeholder = self.driver.placeholder(self.bindings.len());
        let cast = match self.driver {
            Drivers::Postgres => postgres_cast(column_type, value),
            _ => None,
        };
        match cast {
            Some(target) => format!("CAST({} AS {})", placeholder, target),
            None => placeholder,
        }
    }

    fn finish(self, sql: String) -> Statement {
        Statement { sql, bindings: self.bindings }
    }
}

// ============================================================================
// Statement Builder
// ============================================================================

/// Dialect-aware statement factory.
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    driver: Drivers,
}

impl StatementBuilder {
    pub fn new(driver: Drivers) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> Drivers {
        self.driver
    }

    fn quote(&self, ident: &Identifier) -> String {
        ident.quoted(self.driver)
    }

    fn column_ddl(&self, column: &ValidColumn) -> String {
        let nullability = if column.allow_null { "NULL" } else { "NOT NULL" };
        format!("{} {} {}", self.quote(&column.name), column.sql_type, nullability)
    }

    /// Literal default that lets a NOT NULL column be added to a populated table.
    fn not_null_default(&self, column_type: ColumnType) -> &'static str {
        match (column_type, self.driver) {
            (ColumnType::Int | ColumnType::Double, _) => "0",
            (ColumnType::String, _) => "''",
            (ColumnType::Bool, Drivers::SQLite) => "0",
            (ColumnType::Bool, _) => "FALSE",
            (ColumnType::DateTime, _) => "'1970-01-01 00:00:00'",
        }
    }

    /// Projection expression for one column.
    ///
    /// The `Any` driver cannot decode temporal columns (nor MySQL's `tinyint`
    /// booleans), so those are read through a cast that keeps the column name.
    /// Columns of unknown type are read as text.
    fn read_expr(&self, column: &TypedColumn) -> String {
        let name = self.quote(&column.name);
        let target = match (column.column_type, self.driver) {
            (Some(ColumnType::DateTime) | None, Drivers::MySQL) => Some("CHAR"),
            (Some(ColumnType::DateTime) | None, _) => Some("TEXT"),
            (Some(ColumnType::Bool), Drivers::MySQL) => Some("SIGNED"),
            _ => None,
        };
        match target {
            Some(target) => format!("CAST({} AS {}) AS {}", name, target, name),
            None => name,
        }
    }

    fn projection(&self, columns: &[TypedColumn]) -> String {
        columns.iter().map(|col| self.read_expr(col)).collect::<Vec<_>>().join(", ")
    }

    /// `CREATE TABLE IF NOT EXISTS` with the identity key prepended.
    pub fn create_table(&self, table: &Identifier, columns: &[ValidColumn]) -> Statement {
        let mut defs = Vec::with_capacity(columns.len() + 1);
        defs.push(format!("{} {}", self.quote(&Identifier::identity()), self.driver.identity_column_type()));
        defs.extend(columns.iter().map(|col| self.column_ddl(col)));

        Statement::new(format!("CREATE TABLE IF NOT EXISTS {} ({})", self.quote(table), defs.join(", ")))
    }

    pub fn insert(&self, table: &Identifier, values: &[(TypedColumn, Value)]) -> Statement {
        let mut params = Params::new(self.driver);
        let columns: Vec<String> = values.iter().map(|(col, _)| self.quote(&col.name)).collect();
        let placeholders: Vec<String> =
            values.iter().map(|(col, value)| params.push(col.column_type, value)).collect();

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.quote(table),
            columns.join(", "),
            placeholders.join(", ")
        );
        params.finish(sql)
    }

    /// Every row, projected onto all of `columns` (the whole table, in catalog order).
    pub fn select_all(&self, table: &Identifier, columns: &[TypedColumn]) -> Statement {
        self.select_filtered(table, columns, &[])
    }

    pub fn select_columns(&self, table: &Identifier, columns: &[TypedColumn]) -> Statement {
        Statement::new(format!("SELECT {} FROM {}", self.projection(columns), self.quote(table)))
    }

    /// Projected SELECT with ANDed equality predicates; a `Null` filter becomes `IS NULL`.
    pub fn select_filtered(
        &self,
        table: &Identifier,
        columns: &[TypedColumn],
        filters: &[(TypedColumn, Value)],
    ) -> Statement {
        let mut params = Params::new(self.driver);
        let mut sql = format!("SELECT {} FROM {}", self.projection(columns), self.quote(table));

        let conditions: Vec<String> = filters
            .iter()
            .map(|(col, value)| match value {
                Value::Null => format!("{} IS NULL", self.quote(&col.name)),
                _ => format!("{} = {}", self.quote(&col.name), params.push(col.column_type, value)),
            })
            .collect();

        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        params.finish(sql)
    }

    pub fn update_by_id(&self, table: &Identifier, id: i64, values: &[(TypedColumn, Value)]) -> Statement {
        let mut params = Params::new(self.driver);
        let assignments: Vec<String> = values
            .iter()
            .map(|(col, value)| format!("{} = {}", self.quote(&col.name), params.push(col.column_type, value)))
            .collect();
        let id_placeholder = params.push_named("id".to_string(), Some(ColumnType::Int), &Value::Int(id));

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = {}",
            self.quote(table),
            assignments.join(", "),
            self.quote(&Identifier::identity()),
            id_placeholder
        );
        params.finish(sql)
    }

    pub fn delete_by_id(&self, table: &Identifier, id: i64) -> Statement {
        let mut params = Params::new(self.driver);
        let id_placeholder = params.push_named("id".to_string(), Some(ColumnType::Int), &Value::Int(id));

        let sql = format!(
            "DELETE FROM {} WHERE {} = {}",
            self.quote(table),
            self.quote(&Identifier::identity()),
            id_placeholder
        );
        params.finish(sql)
    }

    pub fn drop_table(&self, table: &Identifier) -> Statement {
        Statement::new(format!("DROP TABLE IF EXISTS {}", self.quote(table)))
    }

    /// One `ADD COLUMN` per added column followed by one `DROP COLUMN` per
    /// dropped column, in that order.
    pub fn alter(&self, table: &Identifier, add: &[ValidColumn], drop: &[Identifier]) -> Vec<Statement> {
        let table = self.quote(table);
        let mut statements = Vec::with_capacity(add.len() + drop.len());

        for column in add {
            let mut sql = format!("ALTER TABLE {} ADD COLUMN {}", table, self.column_ddl(column));
            if !column.allow_null {
                sql.push_str(" DEFAULT ");
                sql.push_str(self.not_null_default(column.column_type));
            }
            statements.push(Statement::new(sql));
        }

        for column in drop {
            statements.push(Statement::new(format!("ALTER TABLE {} DROP COLUMN {}", table, self.quote(column))));
        }

        statements
    }
}
