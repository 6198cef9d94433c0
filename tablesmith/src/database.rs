//! # Database Module
//!
//! Connection handling for Tablesmith. It wraps an sqlx `Any` pool, detects the
//! backend dialect from the connection URL and defines the [`Connection`]
//! capability the engine runs statements through. The engine never owns or
//! closes a connection; callers hand it a [`Database`], a [`Transaction`] or a
//! reference to either.

// ============================================================================
// External Crate Imports
// ============================================================================

use futures::future::BoxFuture;
use log::debug;
use sqlx::{
    any::{AnyArguments, AnyPoolOptions, AnyQueryResult, AnyRow},
    AnyPool,
};
use std::{sync::Arc, time::Duration};

// ============================================================================
// Internal Crate Imports
// ============================================================================

use crate::{engine::DataEngine, statement::Statement, transaction::Transaction, Error};

// ============================================================================
// Database Driver Enum
// ============================================================================

/// Supported backends. Each variant carries the SQL dialect differences the
/// statement builder and the introspector need.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drivers {
    /// PostgreSQL driver
    Postgres,
    /// MySQL / MariaDB driver
    MySQL,
    /// SQLite driver
    SQLite,
}

impl Drivers {
    /// Detects the dialect from a connection URL scheme. Anything that is not
    /// PostgreSQL or MySQL is treated as SQLite.
    pub fn from_url(url: &str) -> Self {
        if url.starts_with("postgres") {
            Drivers::Postgres
        } else if url.starts_with("mysql") || url.starts_with("mariadb") {
            Drivers::MySQL
        } else {
            Drivers::SQLite
        }
    }

    /// Character wrapped around identifiers in statement text.
    pub fn quote_char(&self) -> char {
        match self {
            Drivers::MySQL => '`',
            _ => '"',
        }
    }

    /// Positional placeholder for the 1-based parameter `position`.
    pub fn placeholder(&self, position: usize) -> String {
        match self {
            Drivers::Postgres => format!("${}", position),
            _ => "?".to_string(),
        }
    }

    /// Column definition for the implicit identity primary key, minus its name.
    pub fn identity_column_type(&self) -> &'static str {
        match self {
            Drivers::Postgres => "INTEGER GENERATED BY DEFAULT AS IDENTITY NOT NULL PRIMARY KEY",
            Drivers::MySQL => "INT NOT NULL AUTO_INCREMENT PRIMARY KEY",
            Drivers::SQLite => "INTEGER NOT NULL PRIMARY KEY AUTOINCREMENT",
        }
    }

    /// Largest width accepted for a variable-length text column.
    pub fn max_varchar_length(&self) -> i32 {
        match self {
            Drivers::Postgres => 10_485_760,
            // 65535-byte row limit divided by four bytes per utf8mb4 character
            Drivers::MySQL => 16_383,
            Drivers::SQLite => 1_000_000_000,
        }
    }
}

// ============================================================================
// Database Struct
// ============================================================================

/// A pooled connection handle.
///
/// Cheap to clone; every clone shares the same pool.
#[derive(Debug, Clone)]
pub struct Database {
    /// The underlying SQLx connection pool
    pub(crate) pool: AnyPool,
    /// The detected database driver
    pub(crate) driver: Drivers,
}

impl Database {
    /// Creates a new DatabaseBuilder for configuring the connection.
    pub fn builder() -> DatabaseBuilder {
        DatabaseBuilder::new()
    }

    /// Connects to a database using the provided connection string.
    pub async fn connect(url: &str) -> Result<Self, Error> {
        DatabaseBuilder::new().connect(url).await
    }

    pub fn driver(&self) -> Drivers {
        self.driver
    }

    /// A dynamic data engine running on this pool.
    pub fn engine(&self) -> DataEngine<Database> {
        DataEngine::new(self.clone())
    }

    /// Starts a new database transaction.
    pub async fn begin(&self) -> Result<Transaction, Error> {
        let tx = self.pool.begin().await?;
        Ok(Transaction { tx: Arc::new(tokio::sync::Mutex::new(Some(tx))), driver: self.driver })
    }

    /// Closes every pooled connection.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// ============================================================================
// DatabaseBuilder Struct
// ============================================================================

pub struct DatabaseBuilder {
    max_connections: u32,
    acquire_timeout: Option<Duration>,
}

impl Default for DatabaseBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseBuilder {
    pub fn new() -> Self {
        Self { max_connections: 5, acquire_timeout: None }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    pub async fn connect(self, url: &str) -> Result<Database, Error> {
        sqlx::any::install_default_drivers();

        let mut options = AnyPoolOptions::new().max_connections(self.max_connections);
        if let Some(timeout) = self.acquire_timeout {
            options = options.acquire_timeout(timeout);
        }
        let pool = options.connect(url).await?;
        let driver = Drivers::from_url(url);
        debug!("connected to {:?} backend (max_connections = {})", driver, self.max_connections);
        Ok(Database { pool, driver })
    }
}

// ============================================================================
// Connection Trait
// ============================================================================

/// The capability the engine needs from a backing store: run a statement with
/// bound arguments, run a query returning rows, and run a batch atomically.
pub trait Connection: Send + Sync {
    fn driver(&self) -> Drivers;
    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult, sqlx::Error>>;
    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>, sqlx::Error>>;
    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow, sqlx::Error>>;
    /// Executes `statements` in order as a single unit of work and returns the
    /// total number of affected rows.
    fn execute_atomic<'a>(&'a self, statements: &'a [Statement]) -> BoxFuture<'a, Result<u64, sqlx::Error>>;
}

impl Connection for Database {
    fn driver(&self) -> Drivers {
        self.driver
    }
    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).execute(&self.pool).await })
    }
    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).fetch_all(&self.pool).await })
    }
    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow, sqlx::Error>> {
        Box::pin(async move { sqlx::query_with(sql, args).fetch_one(&self.pool).await })
    }
    fn execute_atomic<'a>(&'a self, statements: &'a [Statement]) -> BoxFuture<'a, Result<u64, sqlx::Error>> {
        Box::pin(async move {
            let mut tx = self.pool.begin().await?;
            let mut affected = 0;
            for statement in statements {
                debug!("{}", statement);
                affected += sqlx::query_with(statement.sql(), statement.arguments()?).execute(&mut *tx).await?.rows_affected();
            }
            tx.commit().await?;
            Ok(affected)
        })
    }
}

impl<T: Connection + ?Sized> Connection for &T {
    fn driver(&self) -> Drivers {
        (**self).driver()
    }
    fn execute<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyQueryResult, sqlx::Error>> {
        (**self).execute(sql, args)
    }
    fn fetch_all<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<Vec<AnyRow>, sqlx::Error>> {
        (**self).fetch_all(sql, args)
    }
    fn fetch_one<'a, 'q: 'a>(&'a self, sql: &'q str, args: AnyArguments<'q>) -> BoxFuture<'a, Result<AnyRow, sqlx::Error>> {
        (**self).fetch_one(sql, args)
    }
    fn execute_atomic<'a>(&'a self, statements: &'a [Statement]) -> BoxFuture<'a, Result<u64, sqlx::Error>> {
        (**self).execute_atomic(statements)
    }
}
