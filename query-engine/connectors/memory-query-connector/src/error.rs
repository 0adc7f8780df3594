use query_connector::error::{ConnectorError, ErrorKind};
use query_structure::DomainError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("Unique constraint failed on `{}`.", constraint)]
    UniqueConstraintViolation { constraint: String },

    #[error("Column `{}` cannot be null.", column)]
    NullConstraintViolation { column: String },

    #[error("Cannot generate a value for key column `{}`.", column)]
    KeyGeneration { column: String },

    #[error("Invalid like pattern `{}`.", pattern)]
    InvalidPattern { pattern: String },

    #[error("The transaction was already closed.")]
    TransactionClosed,

    #[error("{}", _0)]
    Domain(#[from] DomainError),
}

impl MemoryError {
    pub fn into_connector_error(self) -> ConnectorError {
        let kind = match self {
            MemoryError::UniqueConstraintViolation { constraint } => {
                ErrorKind::UniqueConstraintViolation { constraint }
            }
            MemoryError::NullConstraintViolation { column } => ErrorKind::NullConstraintViolation { column },
            MemoryError::TransactionClosed => ErrorKind::TransactionAlreadyClosed {
                message: MemoryError::TransactionClosed.to_string(),
            },
            MemoryError::Domain(err) => ErrorKind::DomainError(err),
            err @ (MemoryError::KeyGeneration { .. } | MemoryError::InvalidPattern { .. }) => {
                ErrorKind::QueryError(Box::new(err))
            }
        };

        ConnectorError::from_kind(kind)
    }
}

impl From<MemoryError> for ConnectorError {
    fn from(err: MemoryError) -> Self {
        err.into_connector_error()
    }
}
