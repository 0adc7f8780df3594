use crate::*;
use itertools::Itertools;
use std::{collections::HashSet, sync::Arc};

pub type InternalSchemaRef = InternalSchema;

/// The validated, immutable schema a request runs against. Cheap to clone.
#[derive(Debug, Clone)]
pub struct InternalSchema {
    pub(crate) inner: Arc<SchemaData>,
}

#[derive(Debug)]
pub(crate) struct SchemaData {
    pub(crate) collections: Vec<CollectionData>,
    pub(crate) relationships: Vec<RelationshipData>,
}

#[derive(Debug)]
pub(crate) struct CollectionData {
    pub(crate) name: String,
    pub(crate) table: String,
    pub(crate) path: String,
    pub(crate) properties: Vec<Property>,
    pub(crate) primary_index: Index,
    pub(crate) indexes: Vec<Index>,
    pub(crate) relationships: Vec<RelationshipId>,
}

#[derive(Debug)]
pub(crate) struct RelationshipData {
    pub(crate) name: String,
    pub(crate) collection: CollectionId,
    pub(crate) related: CollectionId,
    pub(crate) kind: RelationKind,
    pub(crate) inverse: Option<RelationshipId>,
}

impl InternalSchema {
    /// Builds the schema and checks the relationship invariants:
    /// - every one-to-many relationship has a many-to-one inverse over the same foreign key columns,
    /// - foreign keys have as many columns as the primary index they reference,
    /// - the two sides of a many-to-many relationship name the same link table with swapped columns.
    pub fn build(definition: SchemaDefinition) -> crate::Result<InternalSchemaRef> {
        let mut collections = Vec::with_capacity(definition.collections.len());
        let mut seen_names = HashSet::new();
        let mut seen_paths = HashSet::new();

        for def in definition.collections.iter() {
            let collection = build_collection(def)?;

            if !seen_names.insert(collection.name.to_lowercase()) {
                return Err(DomainError::invalid_schema(format!(
                    "collection `{}` is defined twice",
                    collection.name
                )));
            }

            if !seen_paths.insert(collection.path.to_lowercase()) {
                return Err(DomainError::invalid_schema(format!(
                    "path `{}` is used by more than one collection",
                    collection.path
                )));
            }

            collections.push(collection);
        }

        // First pass: resolve the relationship targets and key columns.
        let mut relationships: Vec<RelationshipData> = Vec::new();
        let mut pending_inverses = Vec::new();

        for (idx, def) in definition.collections.iter().enumerate() {
            let owner = CollectionId(idx);

            for rel_def in def.relationships.iter() {
                let related = position_of(&collections, &rel_def.related)?;
                let kind = build_relation_kind(&collections[owner.0], &collections[related.0], rel_def)?;

                let data = &collections[owner.0];
                let clashes_with_property = data.properties.iter().any(|p| p.name == rel_def.name);
                let defined_twice = data
                    .relationships
                    .iter()
                    .any(|id| relationships[id.0].name.eq_ignore_ascii_case(&rel_def.name));

                if clashes_with_property || defined_twice {
                    return Err(DomainError::invalid_schema(format!(
                        "relationship `{}` on `{}` clashes with another field",
                        rel_def.name, data.name
                    )));
                }

                let id = RelationshipId(relationships.len());

                relationships.push(RelationshipData {
                    name: rel_def.name.clone(),
                    collection: owner,
                    related,
                    kind,
                    inverse: None,
                });

                collections[owner.0].relationships.push(id);
                pending_inverses.push((id, rel_def.inverse.clone()));
            }
        }

        // Second pass: wire inverses now that every relationship has an id.
        for (id, inverse_name) in pending_inverses {
            let Some(inverse_name) = inverse_name else { continue };
            let related = relationships[id.0].related;

            let inverse = collections[related.0]
                .relationships
                .iter()
                .copied()
                .find(|rid| relationships[rid.0].name == inverse_name)
                .ok_or_else(|| DomainError::RelationshipNotFound {
                    name: inverse_name.clone(),
                    collection: collections[related.0].name.clone(),
                })?;

            relationships[id.0].inverse = Some(inverse);
        }

        for rel in relationships.iter() {
            validate_inverse(rel, &relationships, &collections)?;
        }

        Ok(InternalSchema {
            inner: Arc::new(SchemaData {
                collections,
                relationships,
            }),
        })
    }

    pub fn from_json(json: &str) -> crate::Result<InternalSchemaRef> {
        let definition: SchemaDefinition =
            serde_json::from_str(json).map_err(|err| DomainError::invalid_schema(err.to_string()))?;

        Self::build(definition)
    }

    pub fn collections(&self) -> Vec<Collection> {
        (0..self.inner.collections.len())
            .map(|idx| self.clone().zip(CollectionId(idx)))
            .collect()
    }

    pub fn find_collection(&self, name: &str) -> crate::Result<Collection> {
        self.inner
            .collections
            .iter()
            .position(|c| c.name == name)
            .map(|idx| self.clone().zip(CollectionId(idx)))
            .ok_or_else(|| DomainError::CollectionNotFound { name: name.to_owned() })
    }

    /// Looks a collection up by its URL path segment, case-insensitively.
    pub fn find_collection_by_path(&self, path: &str) -> crate::Result<Collection> {
        self.inner
            .collections
            .iter()
            .position(|c| c.path.eq_ignore_ascii_case(path))
            .map(|idx| self.clone().zip(CollectionId(idx)))
            .ok_or_else(|| DomainError::CollectionNotFound { name: path.to_owned() })
    }

    /// Resolves an entity href of the form `.../<collection path>/<key>` into its collection and key.
    pub fn resolve_href(&self, href: &str) -> crate::Result<(Collection, EntityKey)> {
        let invalid = |message: &str| DomainError::InvalidHref {
            href: href.to_owned(),
            message: message.to_owned(),
        };

        let path = href.split(['?', '#']).next().unwrap_or_default().trim_end_matches('/');
        let mut segments = path.rsplit('/');

        let key = segments.next().filter(|s| !s.is_empty()).ok_or_else(|| invalid("missing key"))?;
        let collection_path = segments
            .next()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| invalid("missing collection"))?;

        let collection = self
            .find_collection_by_path(collection_path)
            .map_err(|_| invalid("unknown collection"))?;

        let key = EntityKey::from_path_segment(key)?;

        Ok((collection, key))
    }

    pub fn zip<T>(self, id: T) -> Zipper<T> {
        Zipper { id, schema: self }
    }

    pub(crate) fn collection_data(&self, id: CollectionId) -> &CollectionData {
        &self.inner.collections[id.0]
    }

    pub(crate) fn relationship_data(&self, id: RelationshipId) -> &RelationshipData {
        &self.inner.relationships[id.0]
    }
}

fn position_of(collections: &[CollectionData], name: &str) -> crate::Result<CollectionId> {
    collections
        .iter()
        .position(|c| c.name == name)
        .map(CollectionId)
        .ok_or_else(|| DomainError::CollectionNotFound { name: name.to_owned() })
}

fn build_collection(def: &CollectionDefinition) -> crate::Result<CollectionData> {
    if def.properties.iter().map(|p| &p.name).duplicates().next().is_some() {
        return Err(DomainError::invalid_schema(format!(
            "collection `{}` defines a property twice",
            def.name
        )));
    }

    let properties: Vec<Property> = def
        .properties
        .iter()
        .map(|p| Property {
            name: p.name.clone(),
            column: p.column.clone().unwrap_or_else(|| p.name.clone()),
            type_identifier: p.type_identifier,
            nullable: p.nullable,
        })
        .collect();

    let resolve = |index_name: &str, names: &[String]| -> crate::Result<Index> {
        if names.is_empty() {
            return Err(DomainError::invalid_schema(format!(
                "index `{index_name}` on `{}` has no properties",
                def.name
            )));
        }

        let props = names
            .iter()
            .map(|name| {
                properties
                    .iter()
                    .find(|p| &p.name == name)
                    .cloned()
                    .ok_or_else(|| DomainError::PropertyNotFound {
                        name: name.clone(),
                        collection: def.name.clone(),
                    })
            })
            .collect::<crate::Result<Vec<_>>>()?;

        Ok(Index::new(index_name, props))
    };

    let primary_index = resolve(PRIMARY_INDEX_NAME, &def.primary_index)?;
    let indexes = def
        .indexes
        .iter()
        .map(|idx| resolve(&idx.name, &idx.properties))
        .collect::<crate::Result<Vec<_>>>()?;

    Ok(CollectionData {
        name: def.name.clone(),
        table: def.table.clone().unwrap_or_else(|| def.name.clone()),
        path: def.path.clone().unwrap_or_else(|| def.name.clone()),
        properties,
        primary_index,
        indexes,
        relationships: Vec::new(),
    })
}

fn find_index(collection: &CollectionData, name: &str) -> crate::Result<Index> {
    if name == PRIMARY_INDEX_NAME {
        return Ok(collection.primary_index.clone());
    }

    collection
        .indexes
        .iter()
        .find(|idx| idx.name == name)
        .cloned()
        .ok_or_else(|| DomainError::IndexNotFound {
            name: name.to_owned(),
            collection: collection.name.clone(),
        })
}

fn build_relation_kind(
    owner: &CollectionData,
    related: &CollectionData,
    def: &RelationshipDefinition,
) -> crate::Result<RelationKind> {
    let mismatch = |what: &str| {
        DomainError::invalid_schema(format!(
            "relationship `{}` on `{}`: {what}",
            def.name, owner.name
        ))
    };

    let foreign_key_name = || def.foreign_key.as_deref().ok_or_else(|| mismatch("missing foreign_key"));

    match def.kind {
        RelationshipKindDefinition::ManyToOne => {
            let foreign_key = find_index(owner, foreign_key_name()?)?;

            if foreign_key.len() != related.primary_index.len() {
                return Err(mismatch("foreign key and referenced primary index differ in column count"));
            }

            Ok(RelationKind::ManyToOne {
                foreign_key,
                referenced: related.primary_index.clone(),
            })
        }
        RelationshipKindDefinition::OneToMany => {
            let foreign_key = find_index(related, foreign_key_name()?)?;

            if foreign_key.len() != owner.primary_index.len() {
                return Err(mismatch("foreign key and referenced primary index differ in column count"));
            }

            Ok(RelationKind::OneToMany {
                referenced: owner.primary_index.clone(),
                foreign_key,
            })
        }
        RelationshipKindDefinition::ManyToMany => {
            let link = def.link.as_ref().ok_or_else(|| mismatch("missing link table"))?;

            if link.parent_columns.len() != owner.primary_index.len() {
                return Err(mismatch("link parent columns do not match the primary index"));
            }

            if link.child_columns.len() != related.primary_index.len() {
                return Err(mismatch("link child columns do not match the related primary index"));
            }

            Ok(RelationKind::ManyToMany {
                link: LinkTable {
                    table: link.table.clone(),
                    parent_columns: link.parent_columns.clone(),
                    child_columns: link.child_columns.clone(),
                },
            })
        }
    }
}

fn validate_inverse(
    rel: &RelationshipData,
    relationships: &[RelationshipData],
    collections: &[CollectionData],
) -> crate::Result<()> {
    let fail = |what: &str| {
        DomainError::invalid_schema(format!(
            "relationship `{}` on `{}`: {what}",
            rel.name, collections[rel.collection.0].name
        ))
    };

    let inverse = rel.inverse.map(|id| &relationships[id.0]);

    if let Some(inverse) = inverse {
        if inverse.related != rel.collection {
            return Err(fail("inverse does not point back to this collection"));
        }
    }

    match (&rel.kind, inverse.map(|inv| &inv.kind)) {
        (RelationKind::OneToMany { .. }, None) => Err(fail("one-to-many relationships need a many-to-one inverse")),
        (RelationKind::OneToMany { foreign_key, .. }, Some(RelationKind::ManyToOne { foreign_key: fk, .. })) => {
            if foreign_key.column_names() == fk.column_names() {
                Ok(())
            } else {
                Err(fail("inverse uses different foreign key columns"))
            }
        }
        (RelationKind::ManyToOne { .. }, None) => Ok(()),
        (RelationKind::ManyToOne { foreign_key, .. }, Some(RelationKind::OneToMany { foreign_key: fk, .. })) => {
            if foreign_key.column_names() == fk.column_names() {
                Ok(())
            } else {
                Err(fail("inverse uses different foreign key columns"))
            }
        }
        (RelationKind::ManyToMany { .. }, None) => Ok(()),
        (RelationKind::ManyToMany { link }, Some(RelationKind::ManyToMany { link: other })) => {
            if link.table == other.table
                && link.parent_columns == other.child_columns
                && link.child_columns == other.parent_columns
            {
                Ok(())
            } else {
                Err(fail("inverse names a different link table or column order"))
            }
        }
        _ => Err(fail("inverse is of an incompatible kind")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn definition(relationships: serde_json::Value) -> SchemaDefinition {
        serde_json::from_value(json!({
            "collections": [
                {
                    "name": "owners",
                    "properties": [{ "name": "id", "type": "number", "nullable": false }],
                    "primary_index": ["id"],
                    "relationships": relationships,
                },
                {
                    "name": "pets",
                    "properties": [
                        { "name": "id", "type": "number", "nullable": false },
                        { "name": "ownerId", "column": "owner_id", "type": "number" },
                    ],
                    "primary_index": ["id"],
                    "indexes": [{ "name": "pets_owner", "properties": ["ownerId"] }],
                    "relationships": [
                        { "name": "owner", "kind": "many_to_one", "related": "owners", "foreign_key": "pets_owner", "inverse": "pets" }
                    ],
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn builds_one_to_many_with_inverse() {
        let schema = InternalSchema::build(definition(json!([
            { "name": "pets", "kind": "one_to_many", "related": "pets", "foreign_key": "pets_owner", "inverse": "owner" }
        ])))
        .unwrap();

        let owners = schema.find_collection("owners").unwrap();
        let pets = owners.find_relationship("PETS").unwrap();

        assert!(pets.is_to_many());
        assert_eq!(pets.related().name(), "pets");
        assert_eq!(pets.inverse().unwrap().name(), "owner");
    }

    #[test]
    fn one_to_many_without_inverse_is_rejected() {
        let err = InternalSchema::build(definition(json!([
            { "name": "pets", "kind": "one_to_many", "related": "pets", "foreign_key": "pets_owner" }
        ])))
        .unwrap_err();

        assert!(matches!(err, DomainError::InvalidSchema { .. }));
    }

    #[test]
    fn resolves_hrefs() {
        let schema = InternalSchema::build(definition(json!([
            { "name": "pets", "kind": "one_to_many", "related": "pets", "foreign_key": "pets_owner", "inverse": "owner" }
        ])))
        .unwrap();
        let (collection, key) = schema.resolve_href("http://localhost/api/pets/12").unwrap();

        assert_eq!(collection.name(), "pets");
        assert_eq!(key.as_str(), "12");
        assert!(schema.resolve_href("http://localhost/api/unknown/12").is_err());
    }
}
