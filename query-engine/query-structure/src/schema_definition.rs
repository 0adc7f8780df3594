use crate::TypeIdentifier;
use serde::{Deserialize, Serialize};

/// The serialisable description an [`InternalSchema`](crate::InternalSchema) is built from.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchemaDefinition {
    pub collections: Vec<CollectionDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionDefinition {
    pub name: String,

    /// Storage table name, defaults to `name`.
    #[serde(default)]
    pub table: Option<String>,

    /// URL path segment, defaults to `name`.
    #[serde(default)]
    pub path: Option<String>,

    pub properties: Vec<PropertyDefinition>,

    /// Property names forming the primary index, in key order.
    pub primary_index: Vec<String>,

    #[serde(default)]
    pub indexes: Vec<IndexDefinition>,

    #[serde(default)]
    pub relationships: Vec<RelationshipDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PropertyDefinition {
    pub name: String,

    #[serde(default)]
    pub column: Option<String>,

    #[serde(rename = "type")]
    pub type_identifier: TypeIdentifier,

    #[serde(default = "default_nullable")]
    pub nullable: bool,
}

fn default_nullable() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    pub properties: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipKindDefinition {
    ManyToOne,
    OneToMany,
    ManyToMany,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipDefinition {
    pub name: String,
    pub kind: RelationshipKindDefinition,
    pub related: String,

    /// For many-to-one: an index on the owning collection.
    /// For one-to-many: an index on the related collection.
    #[serde(default)]
    pub foreign_key: Option<String>,

    /// Required for many-to-many.
    #[serde(default)]
    pub link: Option<LinkTableDefinition>,

    #[serde(default)]
    pub inverse: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LinkTableDefinition {
    pub table: String,

    /// Link table columns referencing the owning collection's primary index.
    pub parent_columns: Vec<String>,

    /// Link table columns referencing the related collection's primary index.
    pub child_columns: Vec<String>,
}
