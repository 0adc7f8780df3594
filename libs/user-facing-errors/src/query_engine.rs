use crate::UserFacingError;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MalformedRequest {
    pub details: String,
}

impl UserFacingError for MalformedRequest {
    const ERROR_CODE: &'static str = "R1000";

    fn message(&self) -> String {
        format!("The request could not be understood: {}", self.details)
    }
}

#[derive(Debug, Serialize)]
pub struct RecordNotFound {
    pub details: String,
}

impl UserFacingError for RecordNotFound {
    const ERROR_CODE: &'static str = "R1001";

    fn message(&self) -> String {
        format!("Nothing matched the request: {}", self.details)
    }
}

#[derive(Debug, Serialize)]
pub struct RelationshipNotFound {
    pub collection: String,
    pub relationship: String,
}

impl UserFacingError for RelationshipNotFound {
    const ERROR_CODE: &'static str = "R1002";

    fn message(&self) -> String {
        format!(
            "The collection `{}` has no relationship named `{}`.",
            self.collection, self.relationship
        )
    }
}

/// Not a user error: the engine detected an inconsistency in its own bookkeeping.
#[derive(Debug, Serialize)]
pub struct InvariantViolation {
    pub details: String,
}

impl UserFacingError for InvariantViolation {
    const ERROR_CODE: &'static str = "R1003";

    fn message(&self) -> String {
        format!("Internal consistency check failed: {}", self.details)
    }
}

#[derive(Debug, Serialize)]
pub struct BackendFailure {
    pub details: String,
}

impl UserFacingError for BackendFailure {
    const ERROR_CODE: &'static str = "R1004";

    fn message(&self) -> String {
        format!("The storage backend reported an error: {}", self.details)
    }
}

#[derive(Debug, Serialize)]
pub struct AccessDenied {
    pub details: String,
}

impl UserFacingError for AccessDenied {
    const ERROR_CODE: &'static str = "R1005";

    fn message(&self) -> String {
        format!("The request was denied: {}", self.details)
    }
}

#[derive(Debug, Serialize)]
pub struct InvalidEntityKey {
    pub key: String,
    pub details: String,
}

impl UserFacingError for InvalidEntityKey {
    const ERROR_CODE: &'static str = "R1006";

    fn message(&self) -> String {
        format!("`{}` is not a valid entity key: {}", self.key, self.details)
    }
}

#[derive(Debug, Serialize)]
pub struct UniqueKeyViolation {
    pub constraint: String,
}

impl UserFacingError for UniqueKeyViolation {
    const ERROR_CODE: &'static str = "R1007";

    fn message(&self) -> String {
        format!("Unique constraint failed on {}", self.constraint)
    }
}

#[derive(Debug, Serialize)]
pub struct NullConstraintViolation {
    pub column: String,
}

impl UserFacingError for NullConstraintViolation {
    const ERROR_CODE: &'static str = "R1008";

    fn message(&self) -> String {
        format!("Null constraint violation on the column `{}`", self.column)
    }
}
