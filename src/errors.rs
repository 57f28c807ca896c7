//! Unified error type for the portal.
//!
//! Core functions return [`Result`]; the HTTP layer maps each variant to a status code
//! in `api::error`. Variants carry enough context to produce a short human-readable message.

use rust_decimal::Decimal;
use sea_orm::{DbErr, SqlErr};
use thiserror::Error;

/// All failures surfaced by the portal.
#[derive(Debug, Error)]
pub enum Error {
    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record (e.g. "Payment")
        entity: &'static str,
        /// Identifier that was looked up
        id: String,
    },

    /// The operation collides with existing state (duplicate key, dependents present)
    #[error("{message}")]
    Conflict {
        /// Human-readable explanation
        message: String,
    },

    /// A required field is missing or malformed
    #[error("{message}")]
    Validation {
        /// Human-readable explanation
        message: String,
    },

    /// A money amount is out of range or has more than two decimal places
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The rejected amount
        amount: Decimal,
    },

    /// No usable caller identity was supplied
    #[error("{message}")]
    Unauthorized {
        /// Human-readable explanation
        message: String,
    },

    /// The caller is known but lacks the required role
    #[error("{message}")]
    Forbidden {
        /// Human-readable explanation
        message: String,
    },

    /// Configuration could not be read or parsed
    #[error("Configuration error: {message}")]
    Config {
        /// Human-readable explanation
        message: String,
    },

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(DbErr),

    /// Filesystem failure (invoice documents, config file)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Shorthand for [`Error::Conflict`].
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Shorthand for [`Error::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }
}

impl From<DbErr> for Error {
    fn from(err: DbErr) -> Self {
        match err.sql_err() {
            Some(SqlErr::UniqueConstraintViolation(detail)) => Self::Conflict {
                message: format!("Duplicate value: {detail}"),
            },
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => Self::Conflict {
                message: format!("Referenced record is missing or still in use: {detail}"),
            },
            _ => Self::Database(err),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
