use crate::UserFacingError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct SchemaParserError {
    pub full_error: String,
}

impl UserFacingError for SchemaParserError {
    const ERROR_CODE: &'static str = "R0001";

    fn message(&self) -> String {
        format!("Schema definition could not be loaded:\n{}", self.full_error)
    }
}

#[derive(Debug, Serialize)]
pub struct InvalidConfiguration {
    pub details: String,
}

impl UserFacingError for InvalidConfiguration {
    const ERROR_CODE: &'static str = "R0002";

    fn message(&self) -> String {
        format!("Engine configuration is invalid: {}", self.details)
    }
}
