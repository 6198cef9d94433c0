//! # Identifier Module
//!
//! Identifier validation and type mapping. Backend parameter protocols bind
//! values, never names, so table and column names are the one place caller
//! text reaches statement text. [`Identifier`] is the only way such text gets
//! there, and the only way to obtain one is through [`Identifier::parse`].

// ============================================================================
// External Crate Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{
    database::Drivers,
    schema::{ColumnDefinition, ColumnType},
    Error,
};

/// Name of the implicit identity primary key every table owns.
pub const IDENTITY_COLUMN: &str = "Id";

/// Width used for `String` columns declared without a positive length.
pub const DEFAULT_STRING_LENGTH: i32 = 255;

/// Longest accepted identifier (PostgreSQL truncates beyond this).
pub const MAX_IDENTIFIER_LENGTH: usize = 63;

// ============================================================================
// Identifier
// ============================================================================

/// A table or column name that matches `[A-Za-z_][A-Za-z0-9_]*`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    /// Validates `name` against the safe-identifier grammar.
    pub fn parse(name: &str) -> Result<Self, Error> {
        if name.trim().is_empty() {
            return Err(Error::InvalidIdentifier("identifier cannot be empty".to_string()));
        }
        if name.len() > MAX_IDENTIFIER_LENGTH {
            return Err(Error::InvalidIdentifier(format!(
                "'{}' is longer than {} characters",
                name, MAX_IDENTIFIER_LENGTH
            )));
        }

        let mut chars = name.chars();
        if let Some(first) = chars.next() {
            if !(first == '_' || first.is_ascii_alphabetic()) {
                return Err(Error::InvalidIdentifier(format!("'{}' must start with a letter or underscore", name)));
            }
        }
        if let Some(bad) = chars.find(|ch| !(*ch == '_' || ch.is_ascii_alphanumeric())) {
            return Err(Error::InvalidIdentifier(format!("'{}' contains invalid character {:?}", name, bad)));
        }

        Ok(Identifier(name.to_string()))
    }

    /// The implicit `Id` column.
    pub fn identity() -> Self {
        Identifier(IDENTITY_COLUMN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `true` when this names the implicit identity column (case-insensitive).
    pub fn is_identity(&self) -> bool {
        self.0.eq_ignore_ascii_case(IDENTITY_COLUMN)
    }

    /// Dialect-quoted form for statement text. The grammar excludes quote
    /// characters, so no escaping is needed.
    pub(crate) fn quoted(&self, driver: Drivers) -> String {
        let q = driver.quote_char();
        format!("{q}{}{q}", self.0)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Validates a caller-supplied identifier.
pub fn validate_identifier(name: &str) -> Result<Identifier, Error> {
    Identifier::parse(name)
}

// ============================================================================
// Type Mapping
// ============================================================================

/// Maps an abstract column type to the backend's native type token.
pub fn map_type(driver: Drivers, column_type: ColumnType, max_length: i32) -> Result<String, Error> {
    let token = match (column_type, driver) {
        (ColumnType::Int, Drivers::MySQL) => "INT".to_string(),
        (ColumnType::Int, _) => "INTEGER".to_string(),
        (ColumnType::String, _) => {
            let width = if max_length > 0 { max_length } else { DEFAULT_STRING_LENGTH };
            if width > driver.max_varchar_length() {
                return Err(Error::UnsupportedType(format!(
                    "String({}) exceeds the {:?} limit of {}",
                    width,
                    driver,
                    driver.max_varchar_length()
                )));
            }
            format!("VARCHAR({})", width)
        }
        (ColumnType::Bool, _) => "BOOLEAN".to_string(),
        (ColumnType::Double, Drivers::Postgres) => "DOUBLE PRECISION".to_string(),
        (ColumnType::Double, Drivers::MySQL) => "DOUBLE".to_string(),
        (ColumnType::Double, Drivers::SQLite) => "REAL".to_string(),
        (ColumnType::DateTime, Drivers::Postgres) => "TIMESTAMP(6)".to_string(),
        (ColumnType::DateTime, Drivers::MySQL) => "DATETIME(6)".to_string(),
        (ColumnType::DateTime, Drivers::SQLite) => "DATETIME".to_string(),
    };
    Ok(token)
}

// ============================================================================
// Validated Column
// ============================================================================

/// A column definition that passed validation and carries its native type.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidColumn {
    pub name: Identifier,
    pub column_type: ColumnType,
    pub sql_type: String,
    pub allow_null: bool,
}

/// Validates a caller column definition for `driver`.
///
/// The name must pass the identifier grammar and must not be the reserved
/// identity column.
pub fn validate_column(driver: Drivers, def: &ColumnDefinition) -> Result<ValidColumn, Error> {
    let name = Identifier::parse(&def.name)?;
    if name.is_identity() {
        return Err(Error::InvalidIdentifier(format!(
            "'{}' is reserved for the implicit identity column",
            def.name
        )));
    }
    let sql_type = map_type(driver, def.column_type, def.max_length)?;
    Ok(ValidColumn { name, column_type: def.column_type, sql_type, allow_null: def.allow_null })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_safe_identifiers() {
        for name in ["Widgets", "_tmp", "order_items2", "A"] {
            assert_eq!(Identifier::parse(name).unwrap().as_str(), name);
        }
    }

    #[test]
    fn rejects_unsafe_identifiers() {
        for name in ["", "   ", "1abc", "a b", "x; DROP TABLE y", "na\"me", "na`me", "tbl--", "été"] {
            let err = Identifier::parse(name).unwrap_err();
            assert!(matches!(err, Error::InvalidIdentifier(_)), "{name:?} should be rejected");
        }
        assert!(Identifier::parse(&"a".repeat(MAX_IDENTIFIER_LENGTH + 1)).is_err());
    }

    #[test]
    fn quoting_follows_dialect() {
        let ident = Identifier::parse("Label").unwrap();
        assert_eq!(ident.quoted(Drivers::Postgres), "\"Label\"");
        assert_eq!(ident.quoted(Drivers::MySQL), "`Label`");
    }

    #[test]
    fn string_width_defaults_to_255() {
        assert_eq!(map_type(Drivers::SQLite, ColumnType::String, 0).unwrap(), "VARCHAR(255)");
        assert_eq!(map_type(Drivers::SQLite, ColumnType::String, -4).unwrap(), "VARCHAR(255)");
        assert_eq!(map_type(Drivers::Postgres, ColumnType::String, 50).unwrap(), "VARCHAR(50)");
    }

    #[test]
    fn maps_every_type_per_dialect() {
        assert_eq!(map_type(Drivers::MySQL, ColumnType::Int, 0).unwrap(), "INT");
        assert_eq!(map_type(Drivers::Postgres, ColumnType::Bool, 0).unwrap(), "BOOLEAN");
        assert_eq!(map_type(Drivers::Postgres, ColumnType::Double, 0).unwrap(), "DOUBLE PRECISION");
        assert_eq!(map_type(Drivers::MySQL, ColumnType::DateTime, 0).unwrap(), "DATETIME(6)");
        assert_eq!(map_type(Drivers::SQLite, ColumnType::DateTime, 0).unwrap(), "DATETIME");
    }

    #[test]
    fn oversized_string_is_unsupported() {
        let err = map_type(Drivers::MySQL, ColumnType::String, 70_000).unwrap_err();
        assert!(matches!(err, Error::UnsupportedType(_)));
    }

    #[test]
    fn identity_column_name_is_reserved() {
        let def = ColumnDefinition::new("id", ColumnType::Int);
        assert!(matches!(validate_column(Drivers::SQLite, &def), Err(Error::InvalidIdentifier(_))));
    }
}
