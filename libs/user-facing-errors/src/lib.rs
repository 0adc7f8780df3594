#![deny(unsafe_code)]

pub mod common;
pub mod query_engine;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// An error with a stable code and a message meant to be shown to API clients.
pub trait UserFacingError: Serialize {
    const ERROR_CODE: &'static str;

    fn message(&self) -> String;
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct KnownError {
    pub message: String,
    pub meta: serde_json::Value,
    pub error_code: Cow<'static, str>,
}

impl KnownError {
    pub fn new<T: UserFacingError>(inner: T) -> KnownError {
        KnownError {
            message: inner.message(),
            meta: serde_json::to_value(&inner).unwrap_or(serde_json::Value::Null),
            error_code: Cow::from(T::ERROR_CODE),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct UnknownError {
    pub message: String,
    pub backtrace: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
#[serde(untagged)]
enum ErrorType {
    Known(KnownError),
    Unknown(UnknownError),
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct Error {
    is_panic: bool,
    #[serde(flatten)]
    inner: ErrorType,

    #[serde(skip_serializing_if = "Option::is_none")]
    batch_request_idx: Option<usize>,
}

impl Error {
    /// Try to interpret the error as a known error.
    pub fn as_known(&self) -> Option<&KnownError> {
        match &self.inner {
            ErrorType::Known(err) => Some(err),
            ErrorType::Unknown(_) => None,
        }
    }

    pub fn message(&self) -> &str {
        match &self.inner {
            ErrorType::Known(err) => &err.message,
            ErrorType::Unknown(err) => &err.message,
        }
    }

    pub fn is_panic(&self) -> bool {
        self.is_panic
    }

    pub fn batch_request_idx(&self) -> Option<usize> {
        self.batch_request_idx
    }

    pub fn set_batch_request_idx(&mut self, idx: usize) {
        self.batch_request_idx = Some(idx);
    }

    pub fn new_non_panic_with_current_backtrace(message: String) -> Self {
        Error {
            inner: ErrorType::Unknown(UnknownError {
                message,
                backtrace: Some(std::backtrace::Backtrace::force_capture().to_string()),
            }),
            is_panic: false,
            batch_request_idx: None,
        }
    }

    /// Construct a new UnknownError from a [`PanicHookInfo`] in a panic hook. [`UnknownError`]s
    /// created with this constructor will have a proper, useful backtrace.
    pub fn new_in_panic_hook(panic_info: &std::panic::PanicHookInfo<'_>) -> Self {
        let message = panic_info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| -> String { (*s).to_owned() })
            .or_else(|| panic_info.payload().downcast_ref::<String>().map(|s| s.to_owned()))
            .unwrap_or_else(|| "<unknown panic>".to_owned());

        let backtrace = Some(format!("{}", std::backtrace::Backtrace::force_capture()));
        let location = panic_info
            .location()
            .map(|loc| format!("{loc}"))
            .unwrap_or_else(|| "<unknown location>".to_owned());

        Error {
            inner: ErrorType::Unknown(UnknownError {
                message: format!("[{location}] {message}"),
                backtrace,
            }),
            is_panic: true,
            batch_request_idx: None,
        }
    }

    /// Build from a panic payload, as returned by `catch_unwind`.
    pub fn from_panic_payload(panic_payload: Box<dyn std::any::Any + Send + 'static>) -> Self {
        let message = Self::extract_panic_message(panic_payload).unwrap_or_else(|| "<unknown panic>".to_owned());

        Error {
            inner: ErrorType::Unknown(UnknownError {
                message,
                backtrace: None,
            }),
            is_panic: true,
            batch_request_idx: None,
        }
    }

    pub fn extract_panic_message(panic_payload: Box<dyn std::any::Any + Send + 'static>) -> Option<String> {
        panic_payload
            .downcast_ref::<&str>()
            .map(|s| -> String { (*s).to_owned() })
            .or_else(|| panic_payload.downcast_ref::<String>().map(|s| s.to_owned()))
    }

    pub fn from_dyn_error(err: &dyn std::error::Error) -> Self {
        Error {
            inner: ErrorType::Unknown(UnknownError {
                message: err.to_string(),
                backtrace: None,
            }),
            is_panic: false,
            batch_request_idx: None,
        }
    }

    pub fn new_known(err: KnownError) -> Self {
        Error {
            inner: ErrorType::Known(err),
            is_panic: false,
            batch_request_idx: None,
        }
    }
}

impl From<KnownError> for Error {
    fn from(known_error: KnownError) -> Self {
        Error::new_known(known_error)
    }
}

impl From<UnknownError> for Error {
    fn from(unknown_error: UnknownError) -> Self {
        Error {
            inner: ErrorType::Unknown(unknown_error),
            is_panic: false,
            batch_request_idx: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn known_errors_serialize_with_code_and_meta() {
        let err = Error::from(KnownError::new(query_engine::RelationshipNotFound {
            collection: "users".into(),
            relationship: "pets".into(),
        }));

        assert_eq!(
            serde_json::to_value(&err).unwrap(),
            json!({
                "is_panic": false,
                "message": "The collection `users` has no relationship named `pets`.",
                "meta": { "collection": "users", "relationship": "pets" },
                "error_code": "R1002",
            })
        );
    }

    #[test]
    fn panic_payloads_become_unknown_errors() {
        let err = Error::from_panic_payload(Box::new("boom"));

        assert!(err.is_panic());
        assert!(err.as_known().is_none());
        assert_eq!(err.message(), "boom");
    }
}
