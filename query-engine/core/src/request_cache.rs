use crate::document::Document;
use query_structure::{CollectionId, EntityKey, RelationshipId};
use std::collections::HashMap;

/// Everything fetched while serving one request, keyed by `(collection, key)`.
///
/// Documents are stored flat, as shaped from their row. Relationship memberships learned along
/// the way are kept next to them so a parent is never asked for the same relationship twice.
#[derive(Debug, Default)]
pub struct RequestKeyCache {
    documents: HashMap<(CollectionId, EntityKey), Document>,
    memberships: HashMap<(RelationshipId, EntityKey), Vec<EntityKey>>,
}

impl RequestKeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, collection: CollectionId, key: &EntityKey) -> bool {
        self.documents.contains_key(&(collection, key.clone()))
    }

    pub fn get(&self, collection: CollectionId, key: &EntityKey) -> Option<&Document> {
        self.documents.get(&(collection, key.clone()))
    }

    /// Returns `false` and leaves the cache untouched when the entity is already present.
    pub fn insert(&mut self, collection: CollectionId, key: EntityKey, document: Document) -> bool {
        match self.documents.entry((collection, key)) {
            std::collections::hash_map::Entry::Occupied(_) => false,
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(document);
                true
            }
        }
    }

    pub fn members(&self, relationship: RelationshipId, parent: &EntityKey) -> Option<&[EntityKey]> {
        self.memberships
            .get(&(relationship, parent.clone()))
            .map(Vec::as_slice)
    }

    pub fn has_members(&self, relationship: RelationshipId, parent: &EntityKey) -> bool {
        self.memberships.contains_key(&(relationship, parent.clone()))
    }

    pub fn set_members(&mut self, relationship: RelationshipId, parent: EntityKey, children: Vec<EntityKey>) {
        self.memberships.insert((relationship, parent), children);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_schema;
    use serde_json::json;

    #[test]
    fn first_insert_wins() {
        let schema = test_schema();
        let owners = schema.find_collection("owners").unwrap();
        let key = EntityKey::new("1");
        let mut cache = RequestKeyCache::new();

        let first = json!({ "name": "Ann" }).as_object().cloned().unwrap();
        let second = json!({ "name": "Impostor" }).as_object().cloned().unwrap();

        assert!(cache.insert(owners.id, key.clone(), first.clone()));
        assert!(!cache.insert(owners.id, key.clone(), second));
        assert_eq!(cache.get(owners.id, &key), Some(&first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn memberships_are_tracked_per_relationship() {
        let schema = test_schema();
        let owners = schema.find_collection("owners").unwrap();
        let pets = owners.find_relationship("pets").unwrap();
        let mut cache = RequestKeyCache::new();

        assert!(!cache.has_members(pets.id, &EntityKey::new("1")));

        cache.set_members(pets.id, EntityKey::new("1"), vec![]);

        assert!(cache.has_members(pets.id, &EntityKey::new("1")));
        assert_eq!(cache.members(pets.id, &EntityKey::new("1")), Some(&[][..]));
    }
}
