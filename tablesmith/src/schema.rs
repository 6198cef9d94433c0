//! # Schema Module
//!
//! Request and response shapes for runtime-described tables. None of these
//! values are persisted; only the effect they describe reaches the store.

// ============================================================================
// External Crate Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, str::FromStr};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::Error;

// ============================================================================
// Column Type Enum
// ============================================================================

/// Abstract column types a caller may request.
///
/// On the wire a type is either its variant name (`"String"`) or its numeric
/// code (`1`), in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ColumnTypeRepr")]
pub enum ColumnType {
    Int,
    String,
    Bool,
    Double,
    DateTime,
}

impl ColumnType {
    pub const ALL: [ColumnType; 5] =
        [ColumnType::Int, ColumnType::String, ColumnType::Bool, ColumnType::Double, ColumnType::DateTime];

    pub fn name(&self) -> &'static str {
        match self {
            ColumnType::Int => "Int",
            ColumnType::String => "String",
            ColumnType::Bool => "Bool",
            ColumnType::Double => "Double",
            ColumnType::DateTime => "DateTime",
        }
    }

    /// Classifies a catalog type name (`character varying`, `tinyint`,
    /// `DATETIME`, ...) as one of the abstract types. `None` for anything the
    /// engine never creates itself, such as `numeric` or `blob`.
    pub fn from_catalog(data_type: &str) -> Option<ColumnType> {
        let lowered = data_type.trim().to_ascii_lowercase();
        let base = lowered.split('(').next().unwrap_or_default().trim();
        match base {
            "integer" | "int" | "int2" | "int4" | "int8" | "smallint" | "mediumint" | "bigint" => Some(ColumnType::Int),
            "character varying" | "varchar" | "character" | "char" | "nvarchar" | "text" => Some(ColumnType::String),
            // MySQL reports BOOLEAN columns as tinyint(1)
            "boolean" | "bool" | "tinyint" | "bit" => Some(ColumnType::Bool),
            "double precision" | "double" | "real" | "float" | "float4" | "float8" => Some(ColumnType::Double),
            _ if base.starts_with("timestamp") || base == "datetime" || base == "date" || base == "time" => {
                Some(ColumnType::DateTime)
            }
            _ => None,
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ColumnType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ColumnType::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| Error::UnsupportedType(s.to_string()))
    }
}

impl TryFrom<i64> for ColumnType {
    type Error = Error;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        usize::try_from(code)
            .ok()
            .and_then(|idx| ColumnType::ALL.get(idx).copied())
            .ok_or_else(|| Error::UnsupportedType(code.to_string()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnTypeRepr {
    Code(i64),
    Name(String),
}

impl TryFrom<ColumnTypeRepr> for ColumnType {
    type Error = Error;

    fn try_from(repr: ColumnTypeRepr) -> Result<Self, Self::Error> {
        match repr {
            ColumnTypeRepr::Code(code) => ColumnType::try_from(code),
            ColumnTypeRepr::Name(name) => name.parse(),
        }
    }
}

// ============================================================================
// Column Definition
// ============================================================================

/// Caller description of one column to create or add.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnDefinition {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
    /// Width for `String` columns; zero or negative selects the default width.
    #[serde(default)]
    pub max_length: i32,
    #[serde(default = "default_allow_null")]
    pub allow_null: bool,
}

fn default_allow_null() -> bool {
    true
}

impl ColumnDefinition {
    /// A nullable column of the given type with the default width.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type, max_length: 0, allow_null: true }
    }

    pub fn max_length(mut self, max_length: i32) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.allow_null = false;
        self
    }

    pub fn nullable(mut self, allow_null: bool) -> Self {
        self.allow_null = allow_null;
        self
    }
}

// ============================================================================
// Table Definition
// ============================================================================

/// Shape of a table to create. The `Id` identity column is implied.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDefinition {
    pub name: String,
    #[serde(default)]
    pub columns: Vec<ColumnDefinition>,
}

impl TableDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), columns: Vec::new() }
    }

    pub fn column(mut self, column: ColumnDefinition) -> Self {
        self.columns.push(column);
        self
    }
}

// ============================================================================
// Table Alteration
// ============================================================================

/// Columns to add to and drop from an existing table.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableAlteration {
    pub table_name: String,
    #[serde(default)]
    pub add_columns: Vec<ColumnDefinition>,
    #[serde(default)]
    pub drop_columns: BTreeSet<String>,
}

impl TableAlteration {
    pub fn new(table_name: impl Into<String>) -> Self {
        Self { table_name: table_name.into(), ..Default::default() }
    }

    pub fn add_column(mut self, column: ColumnDefinition) -> Self {
        self.add_columns.push(column);
        self
    }

    pub fn drop_column(mut self, column: impl Into<String>) -> Self {
        self.drop_columns.insert(column.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.add_columns.is_empty() && self.drop_columns.is_empty()
    }
}

// ============================================================================
// Column Metadata
// ============================================================================

/// Snapshot of an existing column as reported by the store's catalog.
///
/// Stale as soon as any later DDL runs against the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnMetadata {
    pub name: String,
    /// Backend-native type name, e.g. `character varying` or `VARCHAR`.
    pub data_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<i32>,
    pub is_nullable: bool,
    pub is_identity: bool,
    pub is_primary_key: bool,
}

impl ColumnMetadata {
    /// Abstract type of this column, when its catalog type maps to one.
    pub fn column_type(&self) -> Option<ColumnType> {
        ColumnType::from_catalog(&self.data_type)
    }
}
