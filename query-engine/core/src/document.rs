//! JSON documents as clients see them, and the mapping from storage rows.

use crate::CoreError;
use query_structure::{Collection, EntityKey, RelationKind, Record};
use serde_json::{json, Value};

pub type Document = serde_json::Map<String, Value>;

pub const HREF: &str = "href";

/// Shapes a storage row into a document of `collection`.
///
/// Properties appear under their attribute names, many-to-one relationships as `{href}` links
/// built from the foreign key columns (`null` while unset). Columns without a property pass
/// through under the column name.
pub fn shape_record(collection: &Collection, mut record: Record, base_url: &str) -> crate::Result<(EntityKey, Document)> {
    let key = collection.key_of(&record)?;
    let mut document = Document::new();

    document.insert(HREF.to_owned(), Value::String(collection.href(base_url, &key)));

    for relationship in collection.relationships() {
        if let RelationKind::ManyToOne { foreign_key, .. } = relationship.kind() {
            let link = match foreign_key.values_of(&record) {
                Some(values) => {
                    let related = relationship.related();
                    let key = EntityKey::from_values(&values)?;
                    json!({ HREF: related.href(base_url, &key) })
                }
                None => Value::Null,
            };

            document.insert(relationship.name().to_owned(), link);
        }
    }

    for property in collection.properties() {
        let value = record.remove(property.db_name()).unwrap_or(query_structure::ResourceValue::Null);
        document.insert(property.name().to_owned(), Value::from(value));
    }

    for (column, value) in record {
        document.entry(column).or_insert_with(|| Value::from(value));
    }

    Ok((key, document))
}

pub fn href_of(document: &Document) -> Option<&str> {
    document.get(HREF).and_then(Value::as_str)
}

/// The key of a shaped document of `collection`.
pub fn key_of(collection: &Collection, document: &Document) -> crate::Result<EntityKey> {
    let href = href_of(document).ok_or_else(|| CoreError::invariant("Shaped document without href."))?;
    Ok(collection.key_from_href(href)?)
}

/// Reads an href off a child reference: either a bare href string or an object carrying `href`.
pub fn reference_href(value: &Value) -> Option<&str> {
    match value {
        Value::String(href) => Some(href),
        Value::Object(object) => object.get(HREF).and_then(Value::as_str),
        _ => None,
    }
}

/// A reference that only points at an entity without carrying content to write.
pub fn is_link_only(value: &Value) -> bool {
    match value {
        Value::String(_) => true,
        Value::Object(object) => is_link_only_object(object),
        _ => false,
    }
}

pub fn is_link_only_object(object: &Document) -> bool {
    object.len() == 1 && object.contains_key(HREF)
}
