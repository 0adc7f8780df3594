#![deny(unsafe_code)]

pub mod config;
pub mod context;
pub mod document;
pub mod error;
pub mod expansion;
pub mod projection;
pub mod query_translator;
pub mod read;
pub mod request_cache;
pub mod term;
pub mod write;

pub use config::EngineConfig;
pub use context::{DirectFrontDoor, FrontDoor, NestedWrite, NestedWriteResult, RequestContext};
pub use document::Document;
pub use error::CoreError;
pub use projection::Projection;
pub use query_translator::{translate, TranslatedQuery};
pub use read::Page;
pub use request_cache::RequestKeyCache;
pub use write::DeleteTarget;

pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
pub(crate) fn test_schema() -> query_structure::InternalSchemaRef {
    query_structure::InternalSchema::from_json(include_str!("../tests/fixtures/kennel.json"))
        .unwrap_or_else(|err| panic!("invalid test schema: {err}"))
}
