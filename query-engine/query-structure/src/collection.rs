use crate::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionId(pub(crate) usize);

pub type Collection = Zipper<CollectionId>;

impl Collection {
    fn data(&self) -> &crate::internal_schema::CollectionData {
        self.schema.collection_data(self.id)
    }

    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// The name of the backing table.
    pub fn db_name(&self) -> &str {
        &self.data().table
    }

    /// The URL path segment the collection is exposed under.
    pub fn path(&self) -> &str {
        &self.data().path
    }

    pub fn properties(&self) -> &[Property] {
        &self.data().properties
    }

    /// Finds a property by its JSON attribute name. An exact match wins over a case-insensitive one.
    pub fn find_property(&self, name: &str) -> Option<&Property> {
        let properties = self.properties();

        properties
            .iter()
            .find(|p| p.name == name)
            .or_else(|| properties.iter().find(|p| p.name.eq_ignore_ascii_case(name)))
    }

    pub fn find_property_by_column(&self, column: &str) -> Option<&Property> {
        self.properties().iter().find(|p| p.column == column)
    }

    pub fn primary_index(&self) -> &Index {
        &self.data().primary_index
    }

    pub fn indexes(&self) -> &[Index] {
        &self.data().indexes
    }

    pub fn find_index(&self, name: &str) -> crate::Result<&Index> {
        if name.eq_ignore_ascii_case(PRIMARY_INDEX_NAME) {
            return Ok(self.primary_index());
        }

        self.indexes()
            .iter()
            .find(|idx| idx.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| DomainError::IndexNotFound {
                name: name.to_owned(),
                collection: self.name().to_owned(),
            })
    }

    pub fn relationships(&self) -> Vec<Relationship> {
        self.data()
            .relationships
            .iter()
            .map(|id| self.schema.clone().zip(*id))
            .collect()
    }

    /// Relationship lookup by JSON name, case-insensitive.
    pub fn find_relationship(&self, name: &str) -> crate::Result<Relationship> {
        self.relationships()
            .into_iter()
            .find(|rel| rel.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| DomainError::RelationshipNotFound {
                name: name.to_owned(),
                collection: self.name().to_owned(),
            })
    }

    pub fn key_of(&self, record: &Record) -> crate::Result<EntityKey> {
        EntityKey::encode(self.primary_index(), record)
    }

    pub fn decode_key(&self, key: &EntityKey) -> crate::Result<Record> {
        key.decode(self.primary_index())
    }

    /// `{base_url}/{path}/{percent-encoded key}`
    pub fn href(&self, base_url: &str, key: &EntityKey) -> String {
        format!(
            "{}/{}/{}",
            base_url.trim_end_matches('/'),
            self.path(),
            key.to_path_segment()
        )
    }

    /// Extracts the key from an href that must point into this collection.
    pub fn key_from_href(&self, href: &str) -> crate::Result<EntityKey> {
        let (collection, key) = self.schema.resolve_href(href)?;

        if &collection != self {
            return Err(DomainError::InvalidHref {
                href: href.to_owned(),
                message: format!("expected an entity of `{}`", self.name()),
            });
        }

        Ok(key)
    }
}
