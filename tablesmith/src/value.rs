//! # Value Module
//!
//! Runtime-typed scalars crossing the engine boundary. Row payloads and result
//! rows are maps from column name to [`Value`]; nothing about the table shape
//! is known at compile time.

// ============================================================================
// External Crate Imports
// ============================================================================

use chrono::NaiveDateTime;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use sqlx::{
    any::{AnyArguments, AnyRow},
    Arguments, Column, Row, ValueRef,
};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::Error;

/// Text form used when a timestamp is bound as a parameter.
pub(crate) const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Insert/update payload and filter set: column name to value, in the order
/// the caller supplied them.
pub type RowValues = IndexMap<String, Value>;

/// One result row: column name to value, in SELECT projection order.
pub type Record = IndexMap<String, Value>;

// ============================================================================
// Value Enum
// ============================================================================

/// A single scalar cell.
///
/// Serialized as the bare JSON scalar. JSON strings always deserialize to
/// [`Value::Text`]; construct [`Value::Timestamp`] from Rust when a typed
/// timestamp is needed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Timestamp(NaiveDateTime),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Appends this value to a positional argument list.
    pub(crate) fn bind<'q>(&'q self, args: &mut AnyArguments<'q>) -> Result<(), sqlx::Error> {
        let res = match self {
            Value::Null => args.add(Option::<String>::None),
            Value::Bool(v) => args.add(*v),
            Value::Int(v) => args.add(*v),
            Value::Double(v) => args.add(*v),
            Value::Text(v) => args.add(v.as_str()),
            Value::Timestamp(v) => args.add(v.format(TIMESTAMP_FORMAT).to_string()),
        };
        res.map_err(sqlx::Error::Encode)
    }
}

// ============================================================================
// Conversions
// ============================================================================

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Int(i64::from(v))
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Double(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(v: NaiveDateTime) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

impl TryFrom<serde_json::Value> for Value {
    type Error = Error;

    fn try_from(v: serde_json::Value) -> Result<Self, Self::Error> {
        match v {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(b)),
            serde_json::Value::Number(n) => n
                .as_i64()
                .map(Value::Int)
                .or_else(|| n.as_f64().map(Value::Double))
                .ok_or_else(|| Error::invalid(format!("Number out of range: {}", n))),
            serde_json::Value::String(s) => Ok(Value::Text(s)),
            other => Err(Error::invalid(format!("Expected a scalar value, got {}", other))),
        }
    }
}

/// Converts a JSON object into a row payload, rejecting non-scalar members.
pub fn row_values_from_json(object: serde_json::Map<String, serde_json::Value>) -> Result<RowValues, Error> {
    object.into_iter().map(|(k, v)| Ok((k, Value::try_from(v)?))).collect()
}

// ============================================================================
// Row Decoding
// ============================================================================

/// Decodes one cell without knowing the column's declared type.
///
/// The `Any` driver exposes only a handful of value kinds, so the decoder tries
/// them from the most to the least specific.
pub(crate) fn decode_value(row: &AnyRow, index: usize) -> Result<Value, sqlx::Error> {
    if row.try_get_raw(index)?.is_null() {
        return Ok(Value::Null);
    }
    if let Ok(v) = row.try_get::<bool, _>(index) {
        return Ok(Value::Bool(v));
    }
    if let Ok(v) = row.try_get::<i64, _>(index) {
        return Ok(Value::Int(v));
    }
    if let Ok(v) = row.try_get::<f64, _>(index) {
        return Ok(Value::Double(v));
    }
    row.try_get::<String, _>(index).map(Value::Text)
}

/// Maps a result row into a [`Record`] keyed by the projected column names.
pub(crate) fn record_from_row(row: &AnyRow) -> Result<Record, sqlx::Error> {
    let mut record = Record::new();
    for column in row.columns() {
        record.insert(column.name().to_string(), decode_value(row, column.ordinal())?);
    }
    Ok(record)
}
