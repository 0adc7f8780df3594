use resource_value::ConversionFailure;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Collection `{}` not found", name)]
    CollectionNotFound { name: String },

    #[error("Property `{}` on collection `{}` not found", name, collection)]
    PropertyNotFound { name: String, collection: String },

    #[error("Index `{}` on collection `{}` not found", name, collection)]
    IndexNotFound { name: String, collection: String },

    #[error("Relationship `{}` on collection `{}` not found", name, collection)]
    RelationshipNotFound { name: String, collection: String },

    #[error("Invalid schema definition: {}", message)]
    InvalidSchema { message: String },

    #[error("Invalid entity key `{}`: {}", key, message)]
    InvalidEntityKey { key: String, message: String },

    #[error("Invalid href `{}`: {}", href, message)]
    InvalidHref { href: String, message: String },

    #[error("Conversion from `{}` to `{}` failed.", _0, _1)]
    ConversionFailure(String, String),
}

impl DomainError {
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Self::InvalidSchema {
            message: message.into(),
        }
    }

    /// Whether the error was caused by malformed client input rather than a defect in the schema.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidEntityKey { .. } | Self::InvalidHref { .. } | Self::ConversionFailure(..)
        )
    }
}

impl From<ConversionFailure> for DomainError {
    fn from(err: ConversionFailure) -> Self {
        Self::ConversionFailure(err.from.to_owned(), err.to.to_owned())
    }
}
