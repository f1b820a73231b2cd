//! Shared helper functions for PostgreSQL queries and row conversion.

use dmplan_core::error::{StorageError, StorageResult};
use dmplan_core::models::UserRole;

/// Escape `LIKE`/`ILIKE` wildcards so `term` matches literally.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Substring pattern for an `ILIKE` search on `term`.
pub fn contains_pattern(term: &str) -> String {
    format!("%{}%", escape_like(term))
}

/// Parse a stored user role, rejecting unknown values.
pub fn str_to_role(s: &str, field_name: &str) -> StorageResult<UserRole> {
    UserRole::parse(s).ok_or_else(|| {
        StorageError::SerializationError(format!("{} has unknown value: {:?}", field_name, s))
    })
}

/// Map a sqlx error, surfacing constraint violations separately.
pub fn query_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.constraint().is_some() => {
            StorageError::ConstraintViolation(db.message().to_string())
        }
        _ => StorageError::QueryError(e.to_string()),
    }
}
