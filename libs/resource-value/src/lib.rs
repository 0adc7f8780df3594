mod error;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bigdecimal::{BigDecimal, FromPrimitive, ToPrimitive};
use chrono::prelude::*;
use serde::ser::SerializeMap;
use serde::{ser::Serializer, Serialize};
use std::{convert::TryFrom, fmt, str::FromStr};

pub use error::ConversionFailure;
pub type ResourceValueResult<T> = std::result::Result<T, ConversionFailure>;
pub type ResourceListValue = Vec<ResourceValue>;

/// A single value as it travels between storage rows, filters, entity keys and JSON documents.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Serialize, PartialOrd, Ord)]
#[serde(untagged)]
pub enum ResourceValue {
    String(String),
    Boolean(bool),
    Int(i64),
    List(ResourceListValue),

    /// A collections of key-value pairs constituting an object.
    #[serde(serialize_with = "serialize_object")]
    Object(Vec<(String, ResourceValue)>),

    #[serde(serialize_with = "serialize_null")]
    Null,

    #[serde(serialize_with = "serialize_date")]
    DateTime(DateTime<FixedOffset>),

    #[serde(serialize_with = "serialize_decimal")]
    Float(BigDecimal),

    #[serde(serialize_with = "serialize_bytes")]
    Bytes(Vec<u8>),
}

/// Stringify a date to the following format
/// 1999-05-01T00:00:00.000Z
pub fn stringify_datetime(datetime: &DateTime<FixedOffset>) -> String {
    datetime.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parses an RFC 3339 and ISO 8601 date and time string such as 1996-12-19T16:39:57-08:00,
/// then returns a new DateTime with a parsed FixedOffset.
pub fn parse_datetime(datetime: &str) -> chrono::ParseResult<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(datetime)
}

pub fn encode_bytes(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_bytes(s: &str) -> ResourceValueResult<Vec<u8>> {
    STANDARD
        .decode(s)
        .map_err(|_| ConversionFailure::new("base64 encoded bytes", "ResourceValue::Bytes"))
}

impl TryFrom<serde_json::Value> for ResourceValue {
    type Error = ConversionFailure;

    fn try_from(v: serde_json::Value) -> ResourceValueResult<Self> {
        match v {
            serde_json::Value::String(s) => Ok(ResourceValue::String(s)),
            serde_json::Value::Array(v) => {
                let vals: ResourceValueResult<Vec<ResourceValue>> =
                    v.into_iter().map(ResourceValue::try_from).collect();
                Ok(ResourceValue::List(vals?))
            }
            serde_json::Value::Null => Ok(ResourceValue::Null),
            serde_json::Value::Bool(b) => Ok(ResourceValue::Boolean(b)),
            serde_json::Value::Number(num) => match num.as_i64() {
                Some(i) => Ok(ResourceValue::Int(i)),
                None => num
                    .as_f64()
                    .and_then(BigDecimal::from_f64)
                    .map(|dec| ResourceValue::Float(dec.normalized()))
                    .ok_or_else(|| ConversionFailure::new("JSON number", "ResourceValue::Float")),
            },
            serde_json::Value::Object(obj) => {
                let pairs = obj
                    .into_iter()
                    .map(|(k, v)| Ok((k, ResourceValue::try_from(v)?)))
                    .collect::<ResourceValueResult<Vec<_>>>()?;

                Ok(ResourceValue::Object(pairs))
            }
        }
    }
}

impl From<ResourceValue> for serde_json::Value {
    fn from(value: ResourceValue) -> Self {
        match value {
            ResourceValue::String(s) => serde_json::Value::String(s),
            ResourceValue::Boolean(b) => serde_json::Value::Bool(b),
            ResourceValue::Int(i) => serde_json::Value::from(i),
            ResourceValue::Null => serde_json::Value::Null,
            ResourceValue::DateTime(dt) => serde_json::Value::String(stringify_datetime(&dt)),
            ResourceValue::Bytes(b) => serde_json::Value::String(encode_bytes(&b)),
            ResourceValue::Float(dec) => match dec.to_f64().and_then(serde_json::Number::from_f64) {
                Some(num) => serde_json::Value::Number(num),
                None => serde_json::Value::String(dec.to_string()),
            },
            ResourceValue::List(l) => serde_json::Value::Array(l.into_iter().map(serde_json::Value::from).collect()),
            ResourceValue::Object(pairs) => serde_json::Value::Object(
                pairs
                    .into_iter()
                    .map(|(k, v)| (k, serde_json::Value::from(v)))
                    .collect(),
            ),
        }
    }
}

fn serialize_date<S>(date: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    stringify_datetime(date).serialize(serializer)
}

fn serialize_bytes<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    encode_bytes(bytes).serialize(serializer)
}

fn serialize_null<S>(serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    Option::<u8>::None.serialize(serializer)
}

fn serialize_decimal<S>(decimal: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match decimal.to_f64() {
        Some(float) => float.serialize(serializer),
        None => decimal.to_string().serialize(serializer),
    }
}

#[allow(clippy::ptr_arg)]
fn serialize_object<S>(obj: &Vec<(String, ResourceValue)>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let mut map = serializer.serialize_map(Some(obj.len()))?;

    for (k, v) in obj {
        map.serialize_entry(k, v)?;
    }

    map.end()
}

impl ResourceValue {
    /// Infers the value of an unquoted literal: `null`, booleans, integers and decimals are
    /// recognised, everything else stays a string.
    pub fn parse_literal(literal: &str) -> ResourceValue {
        if literal.eq_ignore_ascii_case("null") {
            return ResourceValue::Null;
        }

        if literal.eq_ignore_ascii_case("true") {
            return ResourceValue::Boolean(true);
        }

        if literal.eq_ignore_ascii_case("false") {
            return ResourceValue::Boolean(false);
        }

        if let Ok(int) = literal.parse::<i64>() {
            return ResourceValue::Int(int);
        }

        if is_decimal_literal(literal) {
            if let Ok(dec) = BigDecimal::from_str(literal) {
                return ResourceValue::Float(dec);
            }
        }

        ResourceValue::String(literal.to_owned())
    }

    /// Whether the unquoted token reads as a number, boolean or `null`.
    pub fn is_non_string_literal(literal: &str) -> bool {
        !matches!(ResourceValue::parse_literal(literal), ResourceValue::String(_))
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            ResourceValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            ResourceValue::Bytes(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ResourceValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_boolean(&self) -> Option<&bool> {
        match self {
            ResourceValue::Boolean(bool) => Some(bool),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResourceValue::Null)
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            ResourceValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn into_list(self) -> Option<ResourceListValue> {
        match self {
            ResourceValue::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Vec<(String, ResourceValue)>> {
        match self {
            ResourceValue::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn new_float(float: f64) -> ResourceValueResult<ResourceValue> {
        ResourceValue::try_from(float)
    }

    /// Compares two values numerically when both are numbers, falling back to the total order
    /// of the enum otherwise.
    pub fn compare(&self, other: &ResourceValue) -> std::cmp::Ordering {
        match (self, other) {
            (ResourceValue::Int(a), ResourceValue::Float(b)) => BigDecimal::from(*a).cmp(b),
            (ResourceValue::Float(a), ResourceValue::Int(b)) => a.cmp(&BigDecimal::from(*b)),
            (a, b) => a.cmp(b),
        }
    }

    /// Value equality that treats `Int(1)` and `Float(1.0)` as the same number.
    pub fn loosely_equals(&self, other: &ResourceValue) -> bool {
        self.compare(other) == std::cmp::Ordering::Equal
    }
}

fn is_decimal_literal(literal: &str) -> bool {
    let digits = literal.strip_prefix('-').unwrap_or(literal);
    let mut parts = digits.splitn(2, '.');

    match (parts.next(), parts.next()) {
        (Some(int), Some(frac)) => {
            !int.is_empty()
                && !frac.is_empty()
                && int.chars().all(|c| c.is_ascii_digit())
                && frac.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

impl fmt::Display for ResourceValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ResourceValue::String(x) => x.fmt(f),
            ResourceValue::Float(x) => x.normalized().fmt(f),
            ResourceValue::Boolean(x) => x.fmt(f),
            ResourceValue::DateTime(x) => stringify_datetime(x).fmt(f),
            ResourceValue::Int(x) => x.fmt(f),
            ResourceValue::Null => "null".fmt(f),
            ResourceValue::List(x) => {
                let joined = x.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
                write!(f, "[{joined}]")
            }
            ResourceValue::Bytes(b) => encode_bytes(b).fmt(f),
            ResourceValue::Object(pairs) => {
                let joined = pairs
                    .iter()
                    .map(|(key, value)| format!(r#""{key}": {value}"#))
                    .collect::<Vec<_>>()
                    .join(", ");

                write!(f, "{{ {joined} }}")
            }
        }
    }
}

impl From<&str> for ResourceValue {
    fn from(s: &str) -> Self {
        ResourceValue::from(s.to_string())
    }
}

impl From<String> for ResourceValue {
    fn from(s: String) -> Self {
        ResourceValue::String(s)
    }
}

impl TryFrom<f64> for ResourceValue {
    type Error = ConversionFailure;

    fn try_from(f: f64) -> ResourceValueResult<ResourceValue> {
        BigDecimal::from_f64(f)
            .map(ResourceValue::Float)
            .ok_or_else(|| ConversionFailure::new("f64", "Decimal"))
    }
}

impl From<bool> for ResourceValue {
    fn from(b: bool) -> Self {
        ResourceValue::Boolean(b)
    }
}

impl From<i32> for ResourceValue {
    fn from(i: i32) -> Self {
        ResourceValue::Int(i64::from(i))
    }
}

impl From<i64> for ResourceValue {
    fn from(i: i64) -> Self {
        ResourceValue::Int(i)
    }
}

impl From<ResourceListValue> for ResourceValue {
    fn from(s: ResourceListValue) -> Self {
        ResourceValue::List(s)
    }
}

impl TryFrom<ResourceValue> for i64 {
    type Error = ConversionFailure;

    fn try_from(value: ResourceValue) -> ResourceValueResult<i64> {
        match value {
            ResourceValue::Int(i) => Ok(i),
            _ => Err(ConversionFailure::new("ResourceValue", "i64")),
        }
    }
}

impl TryFrom<ResourceValue> for String {
    type Error = ConversionFailure;

    fn try_from(value: ResourceValue) -> ResourceValueResult<String> {
        match value {
            ResourceValue::String(s) => Ok(s),
            _ => Err(ConversionFailure::new("ResourceValue", "String")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn literals_are_inferred() {
        assert_eq!(ResourceValue::parse_literal("null"), ResourceValue::Null);
        assert_eq!(ResourceValue::parse_literal("TRUE"), ResourceValue::Boolean(true));
        assert_eq!(ResourceValue::parse_literal("-42"), ResourceValue::Int(-42));
        assert_eq!(
            ResourceValue::parse_literal("1.50"),
            ResourceValue::Float(BigDecimal::from_str("1.50").unwrap())
        );
        assert_eq!(ResourceValue::parse_literal("1.5.0"), ResourceValue::from("1.5.0"));
        assert_eq!(ResourceValue::parse_literal("bob"), ResourceValue::from("bob"));
    }

    #[test]
    fn json_objects_keep_their_key_order() {
        let value = ResourceValue::try_from(json!({ "b": 1, "a": [true, null] })).unwrap();

        assert_eq!(
            value,
            ResourceValue::Object(vec![
                ("b".into(), ResourceValue::Int(1)),
                (
                    "a".into(),
                    ResourceValue::List(vec![ResourceValue::Boolean(true), ResourceValue::Null])
                ),
            ])
        );

        assert_eq!(serde_json::Value::from(value), json!({ "b": 1, "a": [true, null] }));
    }

    #[test]
    fn dates_and_bytes_serialize_as_strings() {
        let date = ResourceValue::DateTime(parse_datetime("1999-05-01T00:00:00Z").unwrap());
        let bytes = ResourceValue::Bytes(vec![1, 2, 3]);

        assert_eq!(serde_json::to_value(&date).unwrap(), json!("1999-05-01T00:00:00.000Z"));
        assert_eq!(serde_json::Value::from(bytes.clone()), json!("AQID"));
        assert_eq!(decode_bytes("AQID").unwrap(), bytes.as_bytes().unwrap().to_vec());
    }

    #[test]
    fn ints_and_floats_compare_numerically() {
        let one = ResourceValue::Int(1);
        let one_point_zero = ResourceValue::new_float(1.0).unwrap();
        let two_point_five = ResourceValue::new_float(2.5).unwrap();

        assert!(one.loosely_equals(&one_point_zero));
        assert_eq!(one.compare(&two_point_five), std::cmp::Ordering::Less);
    }
}
