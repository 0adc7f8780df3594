use crate::{DomainError, Index, Record};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use resource_value::ResourceValue;
use std::fmt;

/// Characters escaped when a key is placed into a URL path segment. `~` stays readable.
const KEY_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'&')
    .add(b'+')
    .add(b',')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The string identity of a row: the values of a primary index joined with `~`, in index order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey(String);

impl EntityKey {
    pub const DELIMITER: char = '~';

    /// Wraps an already encoded key, e.g. a path segment.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn encode(index: &Index, record: &Record) -> crate::Result<Self> {
        let values = index.values_of(record).ok_or_else(|| DomainError::InvalidEntityKey {
            key: format!("{record:?}"),
            message: format!("missing a value for one of the columns of index `{}`", index.name()),
        })?;

        Self::from_values(&values)
    }

    pub fn from_values(values: &[ResourceValue]) -> crate::Result<Self> {
        let mut components = Vec::with_capacity(values.len());

        for value in values {
            let component = value.to_string();

            if value.is_null() || component.contains(Self::DELIMITER) || component.is_empty() {
                return Err(DomainError::InvalidEntityKey {
                    key: component,
                    message: format!("key components must be non-empty and must not contain `{}`", Self::DELIMITER),
                });
            }

            components.push(component);
        }

        Ok(Self(components.join(&Self::DELIMITER.to_string())))
    }

    /// Splits the key into a column -> value row fragment for the given index.
    pub fn decode(&self, index: &Index) -> crate::Result<Record> {
        let components: Vec<&str> = self.0.split(Self::DELIMITER).collect();

        if self.0.is_empty() || components.len() != index.len() {
            return Err(DomainError::InvalidEntityKey {
                key: self.0.clone(),
                message: format!("expected {} component(s) for index `{}`", index.len(), index.name()),
            });
        }

        index
            .properties()
            .iter()
            .zip(components)
            .map(|(property, component)| {
                let value = property
                    .coerce(ResourceValue::String(component.to_owned()))
                    .map_err(|err| DomainError::InvalidEntityKey {
                        key: self.0.clone(),
                        message: err.to_string(),
                    })?;

                Ok((property.column.clone(), value))
            })
            .collect()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_path_segment(&self) -> String {
        utf8_percent_encode(&self.0, KEY_SEGMENT).to_string()
    }

    pub fn from_path_segment(segment: &str) -> crate::Result<Self> {
        percent_decode_str(segment)
            .decode_utf8()
            .map(|decoded| Self(decoded.into_owned()))
            .map_err(|_| DomainError::InvalidEntityKey {
                key: segment.to_owned(),
                message: "not valid UTF-8 once percent-decoded".to_owned(),
            })
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Property, TypeIdentifier};
    use pretty_assertions::assert_eq;

    fn composite_index() -> Index {
        Index::new(
            "primary",
            vec![
                Property::new("region", "region", TypeIdentifier::String),
                Property::new("number", "nr", TypeIdentifier::Number),
            ],
        )
    }

    #[test]
    fn single_column_keys_round_trip() {
        let index = Index::new("primary", vec![Property::new("id", "id", TypeIdentifier::Number)]);
        let record: Record = [("id".to_owned(), ResourceValue::Int(7))].into_iter().collect();

        let key = EntityKey::encode(&index, &record).unwrap();

        assert_eq!(key.as_str(), "7");
        assert_eq!(key.decode(&index).unwrap(), record);
    }

    #[test]
    fn composite_keys_round_trip_in_index_order() {
        let index = composite_index();
        let record: Record = [
            ("nr".to_owned(), ResourceValue::Int(12)),
            ("region".to_owned(), ResourceValue::from("eu west")),
            ("other".to_owned(), ResourceValue::from("ignored")),
        ]
        .into_iter()
        .collect();

        let key = EntityKey::encode(&index, &record).unwrap();
        let decoded = key.decode(&index).unwrap();

        assert_eq!(key.as_str(), "eu west~12");
        assert_eq!(decoded.get("region"), Some(&ResourceValue::from("eu west")));
        assert_eq!(decoded.get("nr"), Some(&ResourceValue::Int(12)));
        assert_eq!(EntityKey::encode(&index, &decoded).unwrap(), key);
    }

    #[test]
    fn delimiter_inside_a_component_is_rejected() {
        let index = composite_index();
        let record: Record = [
            ("region".to_owned(), ResourceValue::from("a~b")),
            ("nr".to_owned(), ResourceValue::Int(1)),
        ]
        .into_iter()
        .collect();

        assert!(EntityKey::encode(&index, &record).is_err());
    }

    #[test]
    fn wrong_component_count_is_rejected() {
        assert!(EntityKey::new("only-one").decode(&composite_index()).is_err());
    }

    #[test]
    fn path_segments_are_percent_encoded() {
        let key = EntityKey::new("a/b c~1");

        assert_eq!(key.to_path_segment(), "a%2Fb%20c~1");
        assert_eq!(EntityKey::from_path_segment("a%2Fb%20c~1").unwrap(), key);
    }
}
