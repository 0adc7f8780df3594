use crate::MemoryError;
use query_structure::{Filter, KeyInFilter, Record, ResourceValue, ScalarCondition, ScalarFilter};
use regex::Regex;
use std::cmp::Ordering;

/// Evaluates filters against stored rows. Missing columns read as null, and every comparison
/// involving null is false, except the null tests themselves.
pub(crate) trait Matches {
    fn matches(&self, record: &Record) -> crate::Result<bool>;
}

impl Matches for Filter {
    fn matches(&self, record: &Record) -> crate::Result<bool> {
        match self {
            Filter::And(filters) => {
                for filter in filters {
                    if !filter.matches(record)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Filter::Or(filters) => {
                for filter in filters {
                    if filter.matches(record)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Filter::Not(filters) => Ok(!Filter::And(filters.clone()).matches(record)?),
            Filter::Scalar(sf) => sf.matches(record),
            Filter::KeyIn(kf) => kf.matches(record),
            Filter::Empty => Ok(true),
        }
    }
}

impl Matches for ScalarFilter {
    fn matches(&self, record: &Record) -> crate::Result<bool> {
        let value = record.get(&self.column).unwrap_or(&ResourceValue::Null);

        if let ScalarCondition::IsNull = self.condition {
            return Ok(value.is_null());
        }

        if value.is_null() {
            return Ok(false);
        }

        let result = match &self.condition {
            ScalarCondition::Equals(other) => value.loosely_equals(other),
            ScalarCondition::NotEquals(other) => !other.is_null() && !value.loosely_equals(other),
            ScalarCondition::LessThan(other) => compare(value, other) == Some(Ordering::Less),
            ScalarCondition::LessThanOrEquals(other) => {
                matches!(compare(value, other), Some(Ordering::Less | Ordering::Equal))
            }
            ScalarCondition::GreaterThan(other) => compare(value, other) == Some(Ordering::Greater),
            ScalarCondition::GreaterThanOrEquals(other) => {
                matches!(compare(value, other), Some(Ordering::Greater | Ordering::Equal))
            }
            ScalarCondition::In(values) => values.iter().any(|v| value.loosely_equals(v)),
            ScalarCondition::NotIn(values) => !values.iter().any(|v| value.loosely_equals(v)),
            ScalarCondition::Like(pattern) => like(pattern)?.is_match(&value.to_string()),
            ScalarCondition::NotLike(pattern) => !like(pattern)?.is_match(&value.to_string()),
            ScalarCondition::IsNotNull => true,
            ScalarCondition::IsNull => false,
        };

        Ok(result)
    }
}

impl Matches for KeyInFilter {
    fn matches(&self, record: &Record) -> crate::Result<bool> {
        let row: Option<Vec<&ResourceValue>> = self
            .columns
            .iter()
            .map(|column| record.get(column).filter(|v| !v.is_null()))
            .collect();

        let Some(row) = row else { return Ok(false) };

        Ok(self.values.iter().any(|tuple| {
            tuple.len() == row.len() && tuple.iter().zip(row.iter()).all(|(a, b)| a.loosely_equals(b))
        }))
    }
}

fn compare(a: &ResourceValue, b: &ResourceValue) -> Option<Ordering> {
    if b.is_null() {
        None
    } else {
        Some(a.compare(b))
    }
}

/// Translates a `Like` pattern (`%`, `_`, `\` escapes) into an anchored regex.
pub(crate) fn like(pattern: &str) -> crate::Result<Regex> {
    let mut expr = String::from("(?s)^");
    let mut chars = pattern.chars();

    while let Some(c) = chars.next() {
        match c {
            '%' => expr.push_str(".*"),
            '_' => expr.push('.'),
            '\\' => {
                if let Some(escaped) = chars.next() {
                    expr.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            c => expr.push_str(&regex::escape(&c.to_string())),
        }
    }

    expr.push('$');

    Regex::new(&expr).map_err(|_| MemoryError::InvalidPattern {
        pattern: pattern.to_owned(),
    })
}
