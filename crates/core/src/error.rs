//! Error types for the dmplan domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`StorageError`] - Database/repository errors
//! - [`PaginationError`] - Request validation and cursor errors from the pagination engine
//! - [`DomainError`] - Errors surfaced to API callers (lookups, authorization, validation)
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.
//!
//! Per-id association failures are deliberately absent from this hierarchy:
//! they are returned as data in [`crate::services::SyncOutcome`].

use thiserror::Error;

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization. They propagate unchanged
/// through the pagination engine; retry policy belongs to the store.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Requested record was not found.
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Database constraint was violated (unique, foreign key, etc.).
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Pagination Errors
// =============================================================================

/// Errors raised by [`crate::services::PaginationEngine`].
///
/// Both validation variants are caller mistakes and must not be retried.
/// On [`PaginationError::InvalidCursor`] clients restart from the first page.
#[derive(Debug, Error)]
pub enum PaginationError {
    /// Limit was not positive or offset was negative.
    #[error("Invalid pagination options: {0}")]
    InvalidOptions(String),

    /// Cursor could not be decoded, was tampered with, or belongs to another ordering.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// The backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Domain Errors
// =============================================================================

/// Business logic and domain rule violations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// Parent entity of an operation does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Entity kind, e.g. "ProjectContributor".
        entity: &'static str,
        /// Requested id.
        id: i64,
    },

    /// No authenticated caller.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated caller is not allowed to see the requested data.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Generic validation error.
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Pagination request failed.
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// Storage operation failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for pagination operations.
pub type PaginationResult<T> = Result<T, PaginationError>;
