mod collection;
mod entity_key;
mod error;
mod index;
mod internal_schema;
mod order_by;
mod property;
mod query_arguments;
mod record;
mod relationship;
mod schema_definition;
mod wildcard;
mod zipper;

pub mod filter;
pub mod prelude;

pub use collection::*;
pub use entity_key::*;
pub use error::*;
pub use filter::*;
pub use index::*;
pub use internal_schema::*;
pub use order_by::*;
pub use property::*;
pub use query_arguments::*;
pub use record::*;
pub use relationship::*;
pub use schema_definition::*;
pub use wildcard::*;
pub use zipper::*;

pub use resource_value::ResourceValue;

pub type Result<T> = std::result::Result<T, DomainError>;
