pub use crate::{
    Collection, CollectionId, DomainError, EntityKey, Index, InternalSchemaRef, Property, Record, RelationKind,
    Relationship, RelationshipId, TypeIdentifier,
};
pub use resource_value::ResourceValue;
