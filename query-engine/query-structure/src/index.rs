use crate::{Property, Record};
use resource_value::ResourceValue;

/// Name under which a collection's primary index can be referenced.
pub const PRIMARY_INDEX_NAME: &str = "primary";

/// An ordered, named list of properties forming a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    pub name: String,
    pub properties: Vec<Property>,
}

impl Index {
    pub fn new(name: impl Into<String>, properties: Vec<Property>) -> Self {
        Self {
            name: name.into(),
            properties,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.properties.iter().map(|p| p.column.as_str())
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns().map(ToOwned::to_owned).collect()
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// The values of this index's columns in index order, `None` if any column is missing or null.
    pub fn values_of(&self, record: &Record) -> Option<Vec<ResourceValue>> {
        self.columns()
            .map(|column| record.get(column).filter(|v| !v.is_null()).cloned())
            .collect()
    }

    pub fn all_nullable(&self) -> bool {
        self.properties.iter().all(|p| p.nullable)
    }
}
