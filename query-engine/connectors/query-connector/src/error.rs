use query_structure::DomainError;
use thiserror::Error;
use user_facing_errors::{query_engine, KnownError};

/// A backend failure. Carries a ready-made user facing error when the failure is one clients
/// can act on, such as a violated constraint.
#[derive(Debug, Error)]
#[error("{}", kind)]
pub struct ConnectorError {
    pub user_facing_error: Option<KnownError>,
    pub kind: ErrorKind,
}

impl ConnectorError {
    pub fn from_kind(kind: ErrorKind) -> Self {
        let user_facing_error = match &kind {
            ErrorKind::UniqueConstraintViolation { constraint } => {
                Some(KnownError::new(query_engine::UniqueKeyViolation {
                    constraint: constraint.clone(),
                }))
            }
            ErrorKind::NullConstraintViolation { column } => {
                Some(KnownError::new(query_engine::NullConstraintViolation { column: column.clone() }))
            }
            _ => None,
        };

        ConnectorError {
            user_facing_error,
            kind,
        }
    }

    pub fn query_error(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::from_kind(ErrorKind::QueryError(Box::new(err)))
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("Unique constraint failed: {}", constraint)]
    UniqueConstraintViolation { constraint: String },

    #[error("Null constraint failed: {}", column)]
    NullConstraintViolation { column: String },

    #[error("Error querying the backend: {}", _0)]
    QueryError(Box<dyn std::error::Error + Send + Sync>),

    #[error("{}", _0)]
    DomainError(DomainError),

    #[error("{}", message)]
    TransactionAlreadyClosed { message: String },
}

impl From<DomainError> for ConnectorError {
    fn from(e: DomainError) -> ConnectorError {
        ConnectorError::from_kind(ErrorKind::DomainError(e))
    }
}
