//! # Tablesmith
//!
//! A schema-on-demand data engine built on top of sqlx. Callers describe a
//! table at runtime and Tablesmith creates, alters, populates, queries and
//! drops it on PostgreSQL, MySQL or SQLite, with no compile-time knowledge of
//! its shape.
//!
//! Table and column names only reach SQL text after passing identifier
//! validation; every value is a bound parameter.
//!
//! ```rust,ignore
//! use tablesmith::{ColumnDefinition, ColumnType, Database, RowValues, TableDefinition};
//!
//! let db = Database::connect("sqlite::memory:").await?;
//! let engine = db.engine();
//!
//! engine
//!     .create_table(&TableDefinition::new("Widgets")
//!         .column(ColumnDefinition::new("Label", ColumnType::String).max_length(50).not_null()))
//!     .await?;
//!
//! let mut values = RowValues::new();
//! values.insert("Label".to_string(), "foo".into());
//! engine.insert("Widgets", &values).await?;
//!
//! let rows = engine.get_all("Widgets").await?;
//! ```

pub mod database;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod introspect;
pub mod schema;
pub mod statement;
pub mod transaction;
pub mod value;

pub use database::{Connection, Database, DatabaseBuilder, Drivers};
pub use engine::{AlterMode, DataEngine, EngineOptions};
pub use error::{Error, Result};
pub use identifier::{map_type, validate_identifier, Identifier, DEFAULT_STRING_LENGTH, IDENTITY_COLUMN};
pub use introspect::{ColumnNames, Introspector};
pub use schema::{ColumnDefinition, ColumnMetadata, ColumnType, TableAlteration, TableDefinition};
pub use statement::{Binding, Statement, StatementBuilder, TypedColumn};
pub use transaction::Transaction;
pub use value::{row_values_from_json, Record, RowValues, Value};
