//! Database error types
//!
//! This module defines the error types that can occur during database
//! operations, including the classification of PostgreSQL constraint
//! violations the domain layer depends on (unique-violation races during
//! user synthesis, foreign-key violations on payment insert).

use thiserror::Error;

use core_kernel::PortError;

/// Errors that can occur during database operations
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to establish a database connection
    #[error("Failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Entity not found in database
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    /// Foreign key constraint violation
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// Check or application-level constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Serialization/deserialization of a stored value failed
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Generic SQL error
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Classifies a raw sqlx error by its PostgreSQL error code
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if let Some(code) = db_err.code() {
                match code.as_ref() {
                    // unique_violation
                    "23505" => return DatabaseError::DuplicateEntry(db_err.message().to_string()),
                    // foreign_key_violation
                    "23503" => {
                        return DatabaseError::ForeignKeyViolation(db_err.message().to_string())
                    }
                    // check_violation
                    "23514" => {
                        return DatabaseError::ConstraintViolation(db_err.message().to_string())
                    }
                    _ => {}
                }
            }
        }
        match err {
            sqlx::Error::RowNotFound => DatabaseError::NotFound("row not found".to_string()),
            sqlx::Error::PoolTimedOut => {
                DatabaseError::ConnectionFailed("connection pool timed out".to_string())
            }
            other => DatabaseError::SqlError(other),
        }
    }

    /// Returns true for unique constraint violations
    pub fn is_duplicate(&self) -> bool {
        matches!(self, DatabaseError::DuplicateEntry(_))
    }

    /// Returns true for foreign key violations
    pub fn is_foreign_key_violation(&self) -> bool {
        matches!(self, DatabaseError::ForeignKeyViolation(_))
    }
}

impl From<DatabaseError> for PortError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound(msg) => PortError::NotFound {
                entity_type: "row".to_string(),
                id: msg,
            },
            DatabaseError::DuplicateEntry(msg) => PortError::conflict(msg),
            DatabaseError::ConstraintViolation(msg) => PortError::conflict(msg),
            DatabaseError::ForeignKeyViolation(msg) => PortError::Validation {
                message: msg,
                field: None,
            },
            DatabaseError::ConnectionFailed(msg) => PortError::connection(msg),
            DatabaseError::SerializationError(msg) => PortError::internal(msg),
            DatabaseError::QueryFailed(msg) => PortError::internal(msg),
            DatabaseError::SqlError(e) => PortError::Internal {
                message: "database error".to_string(),
                source: Some(Box::new(e)),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_classification() {
        let err = DatabaseError::DuplicateEntry("payments_user_reference_key".to_string());
        assert!(err.is_duplicate());
        assert!(!err.is_foreign_key_violation());
    }

    #[test]
    fn test_duplicate_maps_to_conflict_port_error() {
        let err: PortError = DatabaseError::DuplicateEntry("dup".to_string()).into();
        assert!(err.is_conflict());
    }

    #[test]
    fn test_not_found_maps_to_not_found_port_error() {
        let err: PortError = DatabaseError::NotFound("payment".to_string()).into();
        assert!(err.is_not_found());
    }
}
