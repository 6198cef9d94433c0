//! # Engine Module
//!
//! The dynamic data engine: the public contract for creating, altering,
//! populating, querying and dropping tables described at runtime.
//!
//! Every mutating operation validates in two stages. Structural checks (empty
//! names, empty payloads, identifier grammar) run before the store is touched.
//! Column existence is then checked against a fresh catalog read; nothing is
//! cached between calls, so a concurrent schema change can still race with the
//! statement that follows.

// ============================================================================
// External Crate Imports
// ============================================================================

use log::{debug, info, warn};
use std::collections::BTreeSet;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    database::Connection,
    identifier::{validate_column, Identifier},
    introspect::{ColumnNames, Introspector},
    schema::{ColumnMetadata, TableAlteration, TableDefinition},
    statement::{Statement, StatementBuilder, TypedColumn},
    value::{record_from_row, Record, RowValues, Value},
    Error, Result,
};

// ============================================================================
// Options
// ============================================================================

/// How [`DataEngine::alter_table`] applies its ALTER statements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlterMode {
    /// All statements run in one transaction; a failure leaves the table as it was.
    /// MySQL commits DDL implicitly and cannot honor this.
    #[default]
    Atomic,
    /// Each statement runs on its own. A failure part-way through leaves the
    /// earlier statements applied and is reported as [`Error::PartialApply`].
    Sequential,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EngineOptions {
    pub alter_mode: AlterMode,
}

// ============================================================================
// Live Table
// ============================================================================

/// Columns of an existing table, read from the catalog for one operation.
struct LiveTable {
    names: ColumnNames,
    columns: Vec<TypedColumn>,
}

impl LiveTable {
    /// Typed column for a name already resolved to its catalog spelling.
    fn typed(&self, name: Identifier) -> TypedColumn {
        match self.columns.iter().find(|col| col.name == name) {
            Some(col) => col.clone(),
            None => TypedColumn::new(name, None),
        }
    }
}

// ============================================================================
// DataEngine Struct
// ============================================================================

/// Runs dynamic table operations through a caller-supplied [`Connection`].
///
/// The engine neither pools nor closes the connection. Build one with
/// [`Database::engine`](crate::Database::engine),
/// [`Transaction::engine`](crate::Transaction::engine) or [`DataEngine::new`].
#[derive(Debug, Clone)]
pub struct DataEngine<C> {
    conn: C,
    options: EngineOptions,
}

impl<C: Connection> DataEngine<C> {
    pub fn new(conn: C) -> Self {
        Self::with_options(conn, EngineOptions::default())
    }

    pub fn with_options(conn: C, options: EngineOptions) -> Self {
        Self { conn, options }
    }

    pub fn with_alter_mode(mut self, alter_mode: AlterMode) -> Self {
        self.options.alter_mode = alter_mode;
        self
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn connection(&self) -> &C {
        &self.conn
    }

    fn builder(&self) -> StatementBuilder {
        StatementBuilder::new(self.conn.driver())
    }

    fn introspector(&self) -> Introspector<'_, C> {
        Introspector::new(&self.conn)
    }

    async fn execute(&self, statement: &Statement) -> Result<u64> {
        debug!("{}", statement);
        let result = self.conn.execute(statement.sql(), statement.arguments()?).await?;
        Ok(result.rows_affected())
    }

    async fn query(&self, statement: &Statement) -> Result<Vec<Record>> {
        debug!("{}", statement);
        let rows = self.conn.fetch_all(statement.sql(), statement.arguments()?).await?;
        Ok(rows.iter().map(record_from_row).collect::<Result<Vec<_>, _>>()?)
    }

    /// Reads the live columns, treating an empty column list as a missing table.
    async fn live_table(&self, table: &Identifier) -> Result<LiveTable> {
        let metadata = self.introspector().list_columns(table.as_str()).await?;
        if metadata.is_empty() {
            return Err(Error::invalid(format!("Table '{}' does not exist.", table)));
        }

        let columns = metadata
            .iter()
            .map(|col| Ok(TypedColumn::new(Identifier::parse(&col.name)?, col.column_type())))
            .collect::<Result<Vec<_>>>()?;
        let names = metadata.into_iter().map(|col| col.name).collect();
        Ok(LiveTable { names, columns })
    }

    // ------------------------------------------------------------------------
    // DDL
    // ------------------------------------------------------------------------

    /// Creates `def` with an implicit `Id` identity primary key.
    ///
    /// A no-op when a table of that name already exists.
    pub async fn create_table(&self, def: &TableDefinition) -> Result<()> {
        let table = table_name(&def.name)?;
        if def.columns.is_empty() {
            return Err(Error::invalid("At least one column must be defined."));
        }

        let driver = self.conn.driver();
        let columns = def.columns.iter().map(|col| validate_column(driver, col)).collect::<Result<Vec<_>>>()?;
        ensure_unique(columns.iter().map(|col| col.name.as_str()))?;

        self.execute(&self.builder().create_table(&table, &columns)).await?;
        info!("created table {} ({} columns)", table, columns.len());
        Ok(())
    }

    /// Adds then drops columns.
    ///
    /// The request is checked against the live schema before anything runs:
    /// the table must exist, added columns must be new and dropped columns must
    /// exist. The identity column can never be dropped.
    pub async fn alter_table(&self, alteration: &TableAlteration) -> Result<()> {
        let table = table_name(&alteration.table_name)?;
        if alteration.is_empty() {
            debug!("nothing to alter on {}", table);
            return Ok(());
        }

        let driver = self.conn.driver();
        let add = alteration.add_columns.iter().map(|col| validate_column(driver, col)).collect::<Result<Vec<_>>>()?;
        let dropped = alteration.drop_columns.iter().map(|name| Identifier::parse(name)).collect::<Result<Vec<_>>>()?;
        if let Some(id) = dropped.iter().find(|col| col.is_identity()) {
            return Err(Error::invalid(format!("Column '{}' cannot be dropped.", id)));
        }
        ensure_unique(add.iter().map(|col| col.name.as_str()).chain(dropped.iter().map(Identifier::as_str)))?;

        let live = self.live_table(&table).await?.names;
        let existing: Vec<&str> = add.iter().map(|col| col.name.as_str()).filter(|name| live.contains(name)).collect();
        if !existing.is_empty() {
            return Err(Error::invalid(format!("Columns already exist: {}", existing.join(", "))));
        }
        let dropped = resolve_columns(&live, dropped.iter().map(Identifier::as_str), "columns")?;

        let statements = self.builder().alter(&table, &add, &dropped);
        match self.options.alter_mode {
            AlterMode::Atomic => {
                self.conn.execute_atomic(&statements).await?;
            }
            AlterMode::Sequential => self.execute_sequential(&statements).await?,
        }
        info!("altered table {} (+{} -{} columns)", table, add.len(), dropped.len());
        Ok(())
    }

    async fn execute_sequential(&self, statements: &[Statement]) -> Result<()> {
        for (applied, statement) in statements.iter().enumerate() {
            match self.execute(statement).await {
                Ok(_) => {}
                Err(Error::StoreUnavailable(source)) if applied > 0 => {
                    warn!("alteration stopped after {} of {} statements: {}", applied, statements.len(), source);
                    return Err(Error::PartialApply { applied, total: statements.len(), source });
                }
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    /// Drops `table`. A no-op when it does not exist.
    pub async fn drop_table(&self, table: &str) -> Result<()> {
        let table = table_name(table)?;
        self.execute(&self.builder().drop_table(&table)).await?;
        info!("dropped table {}", table);
        Ok(())
    }

    // ------------------------------------------------------------------------
    // DML
    // ------------------------------------------------------------------------

    /// Inserts one row and returns the number of affected rows.
    pub async fn insert(&self, table: &str, values: &RowValues) -> Result<u64> {
        let table = table_name(table)?;
        if values.is_empty() {
            return Err(Error::invalid("No values provided for insert."));
        }
        check_grammar(values.keys())?;

        let live = self.live_table(&table).await?;
        let values = resolve_values(&live, values, "columns")?;
        self.execute(&self.builder().insert(&table, &values)).await
    }

    /// Updates the row whose `Id` equals `id`. Zero affected rows when no row
    /// matches; that is not an error.
    pub async fn update_by_id(&self, table: &str, id: i64, values: &RowValues) -> Result<u64> {
        let table = table_name(table)?;
        if values.is_empty() {
            return Err(Error::invalid("No values provided for update."));
        }
        check_grammar(values.keys())?;

        let live = self.live_table(&table).await?;
        let values = resolve_values(&live, values, "columns")?;
        self.execute(&self.builder().update_by_id(&table, id, &values)).await
    }

    /// Deletes the row whose `Id` equals `id`, if any.
    pub async fn delete_by_id(&self, table: &str, id: i64) -> Result<u64> {
        let table = table_name(table)?;
        self.execute(&self.builder().delete_by_id(&table, id)).await
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Every row of `table`, in backend order.
    pub async fn get_all(&self, table: &str) -> Result<Vec<Record>> {
        let table = table_name(table)?;
        let live = self.live_table(&table).await?;
        self.query(&self.builder().select_all(&table, &live.columns)).await
    }

    /// Every row of `table`, projected onto `columns`.
    pub async fn get_columns<S: AsRef<str>>(&self, table: &str, columns: &[S]) -> Result<Vec<Record>> {
        let table = table_name(table)?;
        if columns.is_empty() {
            return Err(Error::invalid("At least one column must be requested."));
        }
        check_grammar(columns)?;

        let live = self.live_table(&table).await?;
        let columns = resolve_columns(&live.names, columns.iter().map(|col| col.as_ref()), "columns")?;
        let columns: Vec<TypedColumn> = columns.into_iter().map(|col| live.typed(col)).collect();
        self.query(&self.builder().select_columns(&table, &columns)).await
    }

    /// Rows of `table` where every filter column equals its value. An empty
    /// filter set matches every row.
    pub async fn get_filtered(&self, table: &str, filters: &RowValues) -> Result<Vec<Record>> {
        let table = table_name(table)?;
        check_grammar(filters.keys())?;

        let live = self.live_table(&table).await?;
        let filters = resolve_values(&live, filters, "filter columns")?;
        self.query(&self.builder().select_filtered(&table, &live.columns, &filters)).await
    }

    // ------------------------------------------------------------------------
    // Catalog
    // ------------------------------------------------------------------------

    pub async fn list_tables(&self) -> Result<Vec<String>> {
        self.introspector().list_tables().await
    }

    pub async fn list_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>> {
        let table = table_name(table)?;
        self.introspector().list_columns(table.as_str()).await
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool> {
        let table = table_name(table)?;
        self.introspector().table_exists(table.as_str()).await
    }
}

// ============================================================================
// Validation Helpers
// ============================================================================

fn table_name(name: &str) -> Result<Identifier> {
    if name.trim().is_empty() {
        return Err(Error::invalid("Table name cannot be empty."));
    }
    Identifier::parse(name)
}

fn check_grammar<I, S>(names: I) -> Result<()>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names.into_iter().try_for_each(|name| Identifier::parse(name.as_ref()).map(|_| ()))
}

/// Rejects names that collide case-insensitively.
fn ensure_unique<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in names {
        if !seen.insert(name.to_lowercase()) {
            return Err(Error::invalid(format!("Duplicate column: {}", name)));
        }
    }
    Ok(())
}

/// Maps caller names onto catalog spellings, reporting every unknown name at once.
fn resolve_columns<'a>(live: &ColumnNames, names: impl IntoIterator<Item = &'a str>, what: &str) -> Result<Vec<Identifier>> {
    let names: Vec<&str> = names.into_iter().collect();
    let invalid: Vec<&str> = names.iter().copied().filter(|name| !live.contains(name)).collect();
    if !invalid.is_empty() {
        return Err(Error::invalid(format!("Invalid {}: {}", what, invalid.join(", "))));
    }

    let resolved = names.iter().filter_map(|name| live.resolve(name)).collect::<Vec<_>>();
    ensure_unique(resolved.iter().copied())?;
    resolved.into_iter().map(Identifier::parse).collect()
}

fn resolve_values(live: &LiveTable, values: &RowValues, what: &str) -> Result<Vec<(TypedColumn, Value)>> {
    let columns = resolve_columns(&live.names, values.keys().map(String::as_str), what)?;
    Ok(columns.into_iter().map(|col| live.typed(col)).zip(values.values().cloned()).collect())
}
