//! Document writes: recursive upsert with relationship reconciliation, flat patch and delete.

mod delete;
mod patch;
mod reconcile;
mod upsert;

pub use delete::{delete, DeleteTarget};
pub use patch::patch;
pub use upsert::upsert;

use crate::{
    document::{self, Document, HREF},
    CoreError,
};
use query_structure::{Collection, EntityKey, Index, Property, RelationKind, Record, ResourceValue};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WriteMode {
    /// Nested content is allowed and written in later phases.
    Upsert,
    /// Only scalar attributes and many-to-one links.
    Patch,
}

/// Flattens the scalar part of a document into a storage row: properties, the primary key taken
/// from `href`, and foreign keys of many-to-one references that carry an href. Attributes unknown
/// to the collection pass through under their own name. To-many fields holding only a link are
/// left untouched in both modes.
pub(crate) fn flatten(collection: &Collection, document: &Document, mode: WriteMode) -> crate::Result<Record> {
    let mut record = Record::new();

    let key = match document.get(HREF) {
        Some(Value::String(href)) => Some(collection.key_from_href(href)?),
        Some(Value::Null) | None => None,
        Some(other) => return Err(CoreError::client(format!("`href` must be a string, found `{other}`."))),
    };

    if let Some(key) = &key {
        record.merge(collection.decode_key(key)?);
    }

    for (name, value) in document {
        if name == HREF {
            continue;
        }

        if let Some(property) = collection.find_property(name) {
            let value = coerce(collection, property, value)?;

            if key.is_some() {
                if let Some(existing) = record.get(property.db_name()) {
                    if collection.primary_index().columns().any(|c| c == property.db_name()) && existing != &value {
                        return Err(CoreError::client(format!(
                            "`{}` contradicts the key of `{}`.",
                            property.name(),
                            document::href_of(document).unwrap_or_default()
                        )));
                    }
                }
            }

            record.insert(property.db_name(), value);
            continue;
        }

        if let Ok(relationship) = collection.find_relationship(name) {
            match relationship.kind() {
                RelationKind::ManyToOne { foreign_key, referenced } => {
                    if value.is_null() {
                        for column in foreign_key.columns() {
                            record.insert(column, ResourceValue::Null);
                        }
                        continue;
                    }

                    if mode == WriteMode::Patch && !document::is_link_only(value) {
                        return Err(CoreError::client(format!(
                            "`{relationship}` only accepts an href or null when patching."
                        )));
                    }

                    match document::reference_href(value) {
                        Some(href) => {
                            let related = relationship.related();
                            let child = related.decode_key(&related.key_from_href(href)?)?;
                            record.merge(foreign_key_values(foreign_key, referenced, &child)?);
                        }
                        None if value.is_object() => (),
                        None => {
                            return Err(CoreError::client(format!(
                                "`{relationship}` expects an object, an href or null."
                            )))
                        }
                    }
                }
                _ if document::is_link_only(value) => (),
                _ if mode == WriteMode::Patch => {
                    return Err(CoreError::client(format!(
                        "`{relationship}` cannot be changed by a patch, send the full document instead."
                    )));
                }
                _ => (),
            }
            continue;
        }

        let value = ResourceValue::try_from(value.clone()).map_err(|err| CoreError::client(err.to_string()))?;
        record.insert(name.clone(), value);
    }

    Ok(record)
}

fn coerce(collection: &Collection, property: &Property, value: &Value) -> crate::Result<ResourceValue> {
    property.coerce_json(value.clone()).map_err(|err| {
        CoreError::client(format!(
            "Invalid value for `{}.{}`: {err}",
            collection.name(),
            property.name()
        ))
    })
}

/// The foreign key columns pointing at `target`, whose `referenced` index values are known.
pub(crate) fn foreign_key_values(foreign_key: &Index, referenced: &Index, target: &Record) -> crate::Result<Record> {
    let values = referenced
        .values_of(target)
        .ok_or_else(|| CoreError::invariant(format!("Incomplete values for index `{}`.", referenced.name())))?;

    Ok(foreign_key.columns().map(str::to_owned).zip(values).collect())
}

/// The key of a reference inside a submitted document.
pub(crate) fn reference_key(related: &Collection, value: &Value) -> crate::Result<EntityKey> {
    let href = document::reference_href(value).ok_or_else(|| {
        CoreError::client(format!("Expected a reference to `{}` carrying an href.", related.name()))
    })?;

    Ok(related.key_from_href(href)?)
}
