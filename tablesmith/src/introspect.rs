//! # Introspect Module
//!
//! Read-only catalog queries. PostgreSQL and MySQL are read through
//! `information_schema`; SQLite through `sqlite_master` and the
//! `pragma_table_info` table-valued function. Table names are always bound as
//! parameters here, never interpolated.

// ============================================================================
// External Crate Imports
// ============================================================================

use sqlx::{
    any::{AnyArguments, AnyRow},
    Arguments, Row,
};
use std::collections::BTreeMap;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    database::{Connection, Drivers},
    schema::ColumnMetadata,
    Error,
};

// ============================================================================
// Catalog Queries
// ============================================================================

fn list_tables_sql(driver: Drivers) -> &'static str {
    match driver {
        Drivers::Postgres => {
            "SELECT table_name::TEXT FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' ORDER BY table_name"
        }
        Drivers::MySQL => {
            "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' ORDER BY table_name"
        }
        Drivers::SQLite => {
            "SELECT name FROM sqlite_master WHERE type = 'table' AND substr(name, 1, 7) <> 'sqlite_' ORDER BY name"
        }
    }
}

fn table_exists_sql(driver: Drivers) -> &'static str {
    match driver {
        Drivers::Postgres => {
            "SELECT EXISTS (SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_type = 'BASE TABLE' AND table_name = $1)"
        }
        Drivers::MySQL => {
            "SELECT COUNT(*) FROM information_schema.tables \
             WHERE table_schema = DATABASE() AND table_type = 'BASE TABLE' AND table_name = ?"
        }
        Drivers::SQLite => "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ? COLLATE NOCASE",
    }
}

fn column_names_sql(driver: Drivers) -> &'static str {
    match driver {
        Drivers::Postgres => {
            "SELECT column_name::TEXT FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 ORDER BY ordinal_position"
        }
        Drivers::MySQL => {
            "SELECT CAST(column_name AS CHAR) FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? ORDER BY ordinal_position"
        }
        Drivers::SQLite => "SELECT name FROM pragma_table_info(?) ORDER BY cid",
    }
}

fn list_columns_sql(driver: Drivers) -> &'static str {
    match driver {
        Drivers::Postgres => {
            "SELECT c.column_name::TEXT, c.data_type::TEXT, c.character_maximum_length::INTEGER, \
                    (c.is_nullable = 'YES'), \
                    (c.is_identity = 'YES' OR COALESCE(c.column_default, '') LIKE 'nextval(%'), \
                    EXISTS (SELECT 1 FROM information_schema.table_constraints tc \
                            JOIN information_schema.key_column_usage k \
                              ON k.constraint_name = tc.constraint_name \
                             AND k.table_schema = tc.table_schema \
                             AND k.table_name = tc.table_name \
                            WHERE tc.constraint_type = 'PRIMARY KEY' \
                              AND tc.table_schema = c.table_schema \
                              AND tc.table_name = c.table_name \
                              AND k.column_name = c.column_name) \
             FROM information_schema.columns c \
             WHERE c.table_schema = current_schema() AND c.table_name = $1 \
             ORDER BY c.ordinal_position"
        }
        Drivers::MySQL => {
            "SELECT CAST(column_name AS CHAR), CAST(data_type AS CHAR), \
                    CAST(character_maximum_length AS SIGNED), \
                    is_nullable = 'YES', extra LIKE '%auto_increment%', column_key = 'PRI' \
             FROM information_schema.columns \
             WHERE table_schema = DATABASE() AND table_name = ? \
             ORDER BY ordinal_position"
        }
        Drivers::SQLite => "SELECT name, type, \"notnull\", pk FROM pragma_table_info(?) ORDER BY cid",
    }
}

// ============================================================================
// Row Helpers
// ============================================================================

/// Reads a boolean that some catalogs report as an integer.
fn get_flag(row: &AnyRow, index: usize) -> Result<bool, sqlx::Error> {
    match row.try_get::<bool, _>(index) {
        Ok(flag) => Ok(flag),
        Err(_) => Ok(row.try_get::<i64, _>(index)? != 0),
    }
}

fn get_opt_length(row: &AnyRow, index: usize) -> Result<Option<i32>, sqlx::Error> {
    let length: Option<i64> = row.try_get(index)?;
    Ok(length.and_then(|len| i32::try_from(len).ok()))
}

/// Splits a SQLite declared type such as `VARCHAR(50)` into name and width.
fn split_declared_type(declared: &str) -> (String, Option<i32>) {
    match declared.split_once('(') {
        Some((name, rest)) => {
            let width = rest.trim_end_matches(')').trim().parse::<i32>().ok();
            (name.trim().to_string(), width)
        }
        None => (declared.trim().to_string(), None),
    }
}

fn table_arg(table: &str) -> Result<AnyArguments<'_>, sqlx::Error> {
    let mut args = AnyArguments::default();
    args.add(table).map_err(sqlx::Error::Encode)?;
    Ok(args)
}

// ============================================================================
// Column Names
// ============================================================================

/// Case-insensitive set of a table's column names.
///
/// Lookups resolve any spelling to the catalog's own spelling, so statements
/// always name the real column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnNames {
    by_folded: BTreeMap<String, String>,
}

impl ColumnNames {
    pub fn contains(&self, name: &str) -> bool {
        self.by_folded.contains_key(&name.to_lowercase())
    }

    /// Catalog spelling of `name`, if the table has such a column.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_folded.get(&name.to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_folded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_folded.is_empty()
    }
}

impl FromIterator<String> for ColumnNames {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self { by_folded: iter.into_iter().map(|name| (name.to_lowercase(), name)).collect() }
    }
}

// ============================================================================
// Introspector
// ============================================================================

/// Catalog reader over any [`Connection`]. Holds no state between calls.
pub struct Introspector<'c, C: Connection> {
    conn: &'c C,
}

impl<'c, C: Connection> Introspector<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Base tables in the default schema, sorted ascending without duplicates.
    pub async fn list_tables(&self) -> Result<Vec<String>, Error> {
        let rows = self.conn.fetch_all(list_tables_sql(self.conn.driver()), AnyArguments::default()).await?;

        let mut tables = rows.iter().map(|row| row.try_get::<String, _>(0)).collect::<Result<Vec<_>, _>>()?;
        tables.sort();
        tables.dedup();
        Ok(tables)
    }

    pub async fn table_exists(&self, table: &str) -> Result<bool, Error> {
        let row = self.conn.fetch_one(table_exists_sql(self.conn.driver()), table_arg(table)?).await?;
        Ok(get_flag(&row, 0)?)
    }

    /// Columns of `table` in ordinal order. Empty when the table does not exist.
    pub async fn list_columns(&self, table: &str) -> Result<Vec<ColumnMetadata>, Error> {
        let driver = self.conn.driver();
        let rows = self.conn.fetch_all(list_columns_sql(driver), table_arg(table)?).await?;

        match driver {
            Drivers::SQLite => Ok(sqlite_columns(&rows)?),
            _ => rows
                .iter()
                .map(|row| {
                    Ok(ColumnMetadata {
                        name: row.try_get(0)?,
                        data_type: row.try_get(1)?,
                        max_length: get_opt_length(row, 2)?,
                        is_nullable: get_flag(row, 3)?,
                        is_identity: get_flag(row, 4)?,
                        is_primary_key: get_flag(row, 5)?,
                    })
                })
                .collect(),
        }
    }

    /// Column names of `table`. Empty when the table does not exist.
    pub async fn valid_column_names(&self, table: &str) -> Result<ColumnNames, Error> {
        let rows = self.conn.fetch_all(column_names_sql(self.conn.driver()), table_arg(table)?).await?;
        Ok(rows.iter().map(|row| row.try_get::<String, _>(0)).collect::<Result<ColumnNames, _>>()?)
    }
}

/// `pragma_table_info` reports `pk` as the 1-based position in the primary key
/// and has no identity marker: a lone `INTEGER` primary key is the rowid alias.
fn sqlite_columns(rows: &[AnyRow]) -> Result<Vec<ColumnMetadata>, sqlx::Error> {
    let mut pk_count = 0;
    let mut raw = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get(0)?;
        let declared: String = row.try_get(1)?;
        let not_null = get_flag(row, 2)?;
        let pk: i64 = row.try_get(3)?;
        if pk > 0 {
            pk_count += 1;
        }
        raw.push((name, declared, not_null, pk > 0));
    }

    Ok(raw
        .into_iter()
        .map(|(name, declared, not_null, is_primary_key)| {
            let (data_type, max_length) = split_declared_type(&declared);
            let is_identity = is_primary_key && pk_count == 1 && data_type.eq_ignore_ascii_case("INTEGER");
            ColumnMetadata {
                name,
                data_type,
                max_length,
                is_nullable: !not_null && !is_identity,
                is_identity,
                is_primary_key,
            }
        })
        .collect())
}
