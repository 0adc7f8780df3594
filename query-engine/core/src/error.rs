use query_connector::error::ConnectorError;
use query_structure::DomainError;
use serde::Serialize;
use thiserror::Error;
use user_facing_errors::{query_engine, KnownError};

#[derive(Debug, Error)]
pub enum CoreError {
    /// Malformed input: bad terms, bad documents, mutually exclusive arguments.
    #[error("{}", _0)]
    ClientRequest(String),

    #[error("{}", _0)]
    NotFound(String),

    #[error("{}", _0)]
    Forbidden(String),

    /// The engine caught itself in an inconsistent state. Never the client's fault.
    #[error("Algorithm invariant violated: {}", _0)]
    AlgorithmInvariant(String),

    #[error("Error in connector: {}", _0)]
    ConnectorError(ConnectorError),

    #[error("Error in domain logic: {}", _0)]
    DomainError(DomainError),

    #[error("{}", _0)]
    ConfigurationError(String),
}

// Default to a json string, equal to to_string (auto-implemented by fmt::Display)
impl Serialize for CoreError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

impl CoreError {
    pub fn client(message: impl Into<String>) -> Self {
        CoreError::ClientRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        CoreError::NotFound(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        CoreError::Forbidden(message.into())
    }

    pub fn invariant(message: impl Into<String>) -> Self {
        CoreError::AlgorithmInvariant(message.into())
    }

    /// Errors the client can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        match self {
            CoreError::ClientRequest(_) => true,
            CoreError::DomainError(err) => err.is_client_error(),
            _ => false,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            CoreError::NotFound(_)
                | CoreError::DomainError(
                    DomainError::CollectionNotFound { .. }
                        | DomainError::RelationshipNotFound { .. }
                        | DomainError::PropertyNotFound { .. }
                )
        )
    }
}

impl From<ConnectorError> for CoreError {
    fn from(e: ConnectorError) -> CoreError {
        CoreError::ConnectorError(e)
    }
}

impl From<DomainError> for CoreError {
    fn from(e: DomainError) -> CoreError {
        CoreError::DomainError(e)
    }
}

impl From<CoreError> for user_facing_errors::Error {
    fn from(err: CoreError) -> user_facing_errors::Error {
        match err {
            CoreError::ConnectorError(ConnectorError {
                user_facing_error: Some(user_facing_error),
                ..
            }) => user_facing_error.into(),

            CoreError::DomainError(DomainError::RelationshipNotFound { name, collection }) => {
                KnownError::new(query_engine::RelationshipNotFound {
                    collection,
                    relationship: name,
                })
                .into()
            }

            CoreError::DomainError(DomainError::InvalidEntityKey { key, message }) => {
                KnownError::new(query_engine::InvalidEntityKey { key, details: message }).into()
            }

            CoreError::DomainError(DomainError::InvalidHref { href, message }) => {
                KnownError::new(query_engine::InvalidEntityKey {
                    key: href,
                    details: message,
                })
                .into()
            }

            err @ CoreError::DomainError(_) if err.is_not_found() => KnownError::new(query_engine::RecordNotFound {
                details: err.to_string(),
            })
            .into(),

            err @ CoreError::DomainError(_) if err.is_client_error() => {
                KnownError::new(query_engine::MalformedRequest {
                    details: err.to_string(),
                })
                .into()
            }

            CoreError::ClientRequest(details) => KnownError::new(query_engine::MalformedRequest { details }).into(),
            CoreError::NotFound(details) => KnownError::new(query_engine::RecordNotFound { details }).into(),
            CoreError::Forbidden(details) => KnownError::new(query_engine::AccessDenied { details }).into(),

            CoreError::AlgorithmInvariant(details) => {
                KnownError::new(query_engine::InvariantViolation { details }).into()
            }

            CoreError::ConnectorError(err) => KnownError::new(query_engine::BackendFailure {
                details: err.to_string(),
            })
            .into(),

            _ => user_facing_errors::Error::from_dyn_error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_connector::error::ErrorKind;

    fn code_of(err: CoreError) -> Option<String> {
        let err: user_facing_errors::Error = err.into();
        err.as_known().map(|known| known.error_code.to_string())
    }

    #[test]
    fn error_codes() {
        assert_eq!(code_of(CoreError::client("bad")).as_deref(), Some("R1000"));
        assert_eq!(code_of(CoreError::not_found("gone")).as_deref(), Some("R1001"));
        assert_eq!(code_of(CoreError::invariant("oops")).as_deref(), Some("R1003"));
        assert_eq!(code_of(CoreError::forbidden("no")).as_deref(), Some("R1005"));

        let unique = ConnectorError::from_kind(ErrorKind::UniqueConstraintViolation {
            constraint: "pets.primary".into(),
        });
        assert_eq!(code_of(unique.into()).as_deref(), Some("R1007"));

        let relationship = DomainError::RelationshipNotFound {
            name: "toys".into(),
            collection: "pets".into(),
        };
        assert_eq!(code_of(relationship.into()).as_deref(), Some("R1002"));

        assert_eq!(code_of(CoreError::ConfigurationError("x".into())), None);
    }

    #[test]
    fn client_errors() {
        assert!(CoreError::client("bad").is_client_error());
        assert!(CoreError::from(DomainError::ConversionFailure("a".into(), "b".into())).is_client_error());
        assert!(!CoreError::invariant("oops").is_client_error());
        assert!(!CoreError::from(DomainError::invalid_schema("broken")).is_client_error());
    }
}
