//! Error types for query construction and data access
//!
//! Filter validation and store operations have separate error enums so that
//! callers can match on query-construction failures without pulling in the
//! database error surface.

use thiserror::Error;

/// Errors raised while turning caller-supplied filter criteria into a query.
///
/// None of these produce any query text: a filter set either validates as a
/// whole or the construction fails.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The named field is not in the permitted filter set.
    #[error("unknown filter field: '{0}'")]
    UnknownField(String),

    #[error("unknown filter operator: '{0}'")]
    UnknownOperator(String),

    /// A numeric field (item size) received a value that does not parse.
    #[error("invalid numeric value '{value}' for filter field '{field}'")]
    InvalidNumber { field: &'static str, value: String },
}

/// Errors from the data-access services.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("{entity} '{id}' already exists")]
    AlreadyExists { entity: &'static str, id: String },

    /// The row is referenced by other records (allocations, items) and the
    /// delete was rejected by a foreign-key constraint.
    #[error("{entity} '{id}' is referenced by other records and cannot be deleted")]
    InUse { entity: &'static str, id: String },

    #[error("invalid filter: {0}")]
    Filter(#[from] FilterError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    pub(crate) fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    pub(crate) fn already_exists(entity: &'static str, id: impl Into<String>) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.into(),
        }
    }

    /// Maps a delete failure to `InUse` when the database rejected it with a
    /// foreign-key violation (SQLSTATE 23503), passing everything else through.
    pub(crate) fn from_delete(err: sqlx::Error, entity: &'static str, id: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err {
            if db_err.code().as_deref() == Some("23503") {
                return Self::InUse {
                    entity,
                    id: id.to_string(),
                };
            }
        }
        Self::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_error_messages_name_the_field() {
        let err = FilterError::UnknownField("color".to_string());
        assert_eq!(err.to_string(), "unknown filter field: 'color'");

        let err = FilterError::InvalidNumber {
            field: "size",
            value: "big".to_string(),
        };
        assert!(err.to_string().contains("'big'"));
        assert!(err.to_string().contains("'size'"));
    }

    #[test]
    fn store_error_wraps_filter_error() {
        let err: StoreError = FilterError::UnknownField("color".to_string()).into();
        assert!(matches!(err, StoreError::Filter(_)));
    }
}
