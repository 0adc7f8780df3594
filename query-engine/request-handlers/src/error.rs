use query_connector::error::ConnectorError;
use query_core::CoreError;
use query_structure::DomainError;
use thiserror::Error;
use user_facing_errors::{query_engine::MalformedRequest, KnownError};

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{}", _0)]
    Core(#[from] CoreError),

    #[error("Invalid request body: {}", _0)]
    InvalidBody(String),

    #[error("Unsupported method `{}`.", _0)]
    UnsupportedMethod(String),

    #[error("{}", _0)]
    Configuration(String),
}

impl HandlerError {
    pub fn invalid_body(message: impl ToString) -> Self {
        Self::InvalidBody(message.to_string())
    }

    pub fn configuration(message: impl ToString) -> Self {
        Self::Configuration(message.to_string())
    }

    /// The HTTP status this error is reported with.
    pub fn status(&self) -> u16 {
        match self {
            HandlerError::Core(CoreError::Forbidden(_)) => 403,
            HandlerError::Core(err) if err.is_not_found() => 404,
            HandlerError::Core(err) if err.is_client_error() => 400,
            HandlerError::Core(_) => 500,
            HandlerError::InvalidBody(_) => 400,
            HandlerError::UnsupportedMethod(_) => 405,
            HandlerError::Configuration(_) => 500,
        }
    }
}

impl From<ConnectorError> for HandlerError {
    fn from(err: ConnectorError) -> Self {
        Self::Core(CoreError::from(err))
    }
}

impl From<DomainError> for HandlerError {
    fn from(err: DomainError) -> Self {
        Self::Core(CoreError::from(err))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        Self::invalid_body(err)
    }
}

impl From<HandlerError> for user_facing_errors::Error {
    fn from(err: HandlerError) -> Self {
        match err {
            HandlerError::Core(err) => err.into(),
            HandlerError::InvalidBody(_) | HandlerError::UnsupportedMethod(_) => {
                KnownError::new(MalformedRequest { details: err.to_string() }).into()
            }
            HandlerError::Configuration(_) => user_facing_errors::Error::from_dyn_error(&err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_kind() {
        assert_eq!(HandlerError::from(CoreError::client("bad")).status(), 400);
        assert_eq!(HandlerError::from(CoreError::not_found("gone")).status(), 404);
        assert_eq!(HandlerError::from(CoreError::forbidden("no")).status(), 403);
        assert_eq!(HandlerError::from(CoreError::invariant("twice")).status(), 500);
        assert_eq!(HandlerError::UnsupportedMethod("TRACE".into()).status(), 405);

        let unknown = DomainError::CollectionNotFound { name: "cats".into() };
        assert_eq!(HandlerError::from(unknown).status(), 404);
    }

    #[test]
    fn body_errors_are_malformed_requests() {
        let err: user_facing_errors::Error = HandlerError::invalid_body("expected an object").into();
        let known = err.as_known().unwrap();

        assert_eq!(known.error_code, "R1000");
    }
}
