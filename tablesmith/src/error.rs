//! # Error Module
//!
//! Error taxonomy for the dynamic data engine. Validation failures are raised
//! before any statement reaches the store; store failures are passed through
//! unclassified.

use thiserror::Error;

/// Errors returned by every Tablesmith operation.
#[derive(Debug, Error)]
pub enum Error {
    /// A required field is empty or missing, a payload is empty, or a column
    /// or table reference does not match the live schema.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A table or column name failed the safe-identifier grammar.
    #[error("Invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// A column type outside the supported enumeration was requested.
    #[error("Unsupported type: {0}")]
    UnsupportedType(String),

    /// The backing store could not be reached or rejected the statement.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] sqlx::Error),

    /// A sequential alteration failed after some statements were already applied.
    #[error("Alteration partially applied ({applied} of {total} statements): {source}")]
    PartialApply {
        applied: usize,
        total: usize,
        #[source]
        source: sqlx::Error,
    },
}

impl Error {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    /// `true` for invalid arguments, including identifier grammar failures.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_) | Error::InvalidIdentifier(_))
    }

    /// `true` when the failure originated in the backing store.
    pub fn is_store_error(&self) -> bool {
        matches!(self, Error::StoreUnavailable(_) | Error::PartialApply { .. })
    }

    /// `true` when the caller sent a request that can never succeed as-is.
    pub fn is_client_error(&self) -> bool {
        self.is_invalid_argument() || matches!(self, Error::UnsupportedType(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
