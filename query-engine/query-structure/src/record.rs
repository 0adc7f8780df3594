use indexmap::IndexMap;
use resource_value::ResourceValue;

/// An ordered map from storage column name to value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    values: IndexMap<String, ResourceValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&ResourceValue> {
        self.values.get(column)
    }

    pub fn insert(&mut self, column: impl Into<String>, value: ResourceValue) -> Option<ResourceValue> {
        self.values.insert(column.into(), value)
    }

    /// Removes a column, keeping the order of the remaining ones.
    pub fn remove(&mut self, column: &str) -> Option<ResourceValue> {
        self.values.shift_remove(column)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.values.contains_key(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ResourceValue)> + '_ {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies the given columns out of this record, `None` if one of them is missing.
    pub fn select<'a>(&self, columns: impl IntoIterator<Item = &'a str>) -> Option<Record> {
        columns
            .into_iter()
            .map(|column| self.values.get(column).map(|v| (column.to_owned(), v.clone())))
            .collect()
    }

    /// Overwrites this record's values with the ones from `other`.
    pub fn merge(&mut self, other: Record) {
        self.values.extend(other.values)
    }
}

impl FromIterator<(String, ResourceValue)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, ResourceValue)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, ResourceValue);
    type IntoIter = indexmap::map::IntoIter<String, ResourceValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl From<IndexMap<String, ResourceValue>> for Record {
    fn from(values: IndexMap<String, ResourceValue>) -> Self {
        Self { values }
    }
}
