use crate::DomainError;
use resource_value::{decode_bytes, parse_datetime, ResourceValue};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeIdentifier {
    String,
    Number,
    Boolean,
    #[serde(alias = "date")]
    DateTime,
    #[serde(alias = "binary")]
    Bytes,
    Array,
    Object,
}

impl TypeIdentifier {
    pub fn name(&self) -> &'static str {
        match self {
            TypeIdentifier::String => "string",
            TypeIdentifier::Number => "number",
            TypeIdentifier::Boolean => "boolean",
            TypeIdentifier::DateTime => "datetime",
            TypeIdentifier::Bytes => "bytes",
            TypeIdentifier::Array => "array",
            TypeIdentifier::Object => "object",
        }
    }
}

/// Maps a JSON attribute onto a storage column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Property {
    pub name: String,
    pub column: String,
    pub type_identifier: TypeIdentifier,
    pub nullable: bool,
}

impl Property {
    pub fn new(name: impl Into<String>, column: impl Into<String>, type_identifier: TypeIdentifier) -> Self {
        Self {
            name: name.into(),
            column: column.into(),
            type_identifier,
            nullable: true,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn db_name(&self) -> &str {
        &self.column
    }

    /// Coerces a JSON attribute value into the storage representation of this property.
    pub fn coerce_json(&self, value: serde_json::Value) -> crate::Result<ResourceValue> {
        let value = ResourceValue::try_from(value)?;
        self.coerce(value)
    }

    /// Coerces an already parsed value (a JSON attribute, a query literal or a key component).
    pub fn coerce(&self, value: ResourceValue) -> crate::Result<ResourceValue> {
        let fail = |value: &ResourceValue| {
            DomainError::ConversionFailure(
                format!("{value} (property `{}`)", self.name),
                self.type_identifier.name().to_owned(),
            )
        };

        let coerced = match (self.type_identifier, value) {
            (_, ResourceValue::Null) => ResourceValue::Null,

            (TypeIdentifier::String, ResourceValue::String(s)) => ResourceValue::String(s),
            (
                TypeIdentifier::String,
                v @ (ResourceValue::Int(_) | ResourceValue::Float(_) | ResourceValue::Boolean(_)),
            ) => ResourceValue::String(v.to_string()),

            (TypeIdentifier::Number, v @ (ResourceValue::Int(_) | ResourceValue::Float(_))) => v,
            (TypeIdentifier::Number, ResourceValue::String(s)) => match ResourceValue::parse_literal(s.trim()) {
                v @ (ResourceValue::Int(_) | ResourceValue::Float(_)) => v,
                _ => return Err(fail(&ResourceValue::String(s))),
            },

            (TypeIdentifier::Boolean, ResourceValue::Boolean(b)) => ResourceValue::Boolean(b),
            (TypeIdentifier::Boolean, ResourceValue::String(s)) => match bool::from_str(&s.to_lowercase()) {
                Ok(b) => ResourceValue::Boolean(b),
                Err(_) => return Err(fail(&ResourceValue::String(s))),
            },
            (TypeIdentifier::Boolean, ResourceValue::Int(i)) if i == 0 || i == 1 => ResourceValue::Boolean(i == 1),

            (TypeIdentifier::DateTime, ResourceValue::DateTime(dt)) => ResourceValue::DateTime(dt),
            (TypeIdentifier::DateTime, ResourceValue::String(s)) => match parse_datetime(&s) {
                Ok(dt) => ResourceValue::DateTime(dt),
                Err(_) => return Err(fail(&ResourceValue::String(s))),
            },

            (TypeIdentifier::Bytes, ResourceValue::Bytes(b)) => ResourceValue::Bytes(b),
            (TypeIdentifier::Bytes, ResourceValue::String(s)) => ResourceValue::Bytes(decode_bytes(&s)?),

            (TypeIdentifier::Array, v @ ResourceValue::List(_)) => v,
            (TypeIdentifier::Object, v @ ResourceValue::Object(_)) => v,

            (_, v) => return Err(fail(&v)),
        };

        Ok(coerced)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn coerces_json_by_type() {
        let age = Property::new("age", "age", TypeIdentifier::Number);
        let name = Property::new("name", "full_name", TypeIdentifier::String);
        let active = Property::new("active", "active", TypeIdentifier::Boolean);

        assert_eq!(age.coerce_json(json!("42")).unwrap(), ResourceValue::Int(42));
        assert_eq!(name.coerce_json(json!(42)).unwrap(), ResourceValue::from("42"));
        assert_eq!(active.coerce_json(json!("TRUE")).unwrap(), ResourceValue::Boolean(true));
        assert_eq!(age.coerce_json(json!(null)).unwrap(), ResourceValue::Null);
    }

    #[test]
    fn rejects_values_of_the_wrong_shape() {
        let age = Property::new("age", "age", TypeIdentifier::Number);

        assert!(age.coerce_json(json!("forty")).is_err());
        assert!(age.coerce_json(json!({ "a": 1 })).is_err());
    }

    #[test]
    fn parses_datetimes() {
        let born = Property::new("born", "born", TypeIdentifier::DateTime);
        let value = born.coerce_json(json!("2001-02-03T04:05:06Z")).unwrap();

        assert_eq!(value.to_string(), "2001-02-03T04:05:06.000Z");
    }
}
