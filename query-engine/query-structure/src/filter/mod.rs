//! Backend-neutral filter expressions over storage columns.

mod scalar;

pub use scalar::*;

use crate::{Index, Record};
use resource_value::ResourceValue;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Vec<Filter>),
    Scalar(ScalarFilter),
    /// Row value of `columns` is one of `values` (tuple membership).
    KeyIn(KeyInFilter),
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyInFilter {
    pub columns: Vec<String>,
    pub values: Vec<Vec<ResourceValue>>,
}

impl Filter {
    pub fn empty() -> Self {
        Self::Empty
    }

    pub fn and(filters: Vec<Filter>) -> Self {
        Self::And(filters)
    }

    pub fn or(filters: Vec<Filter>) -> Self {
        Self::Or(filters)
    }

    pub fn not(filters: Vec<Filter>) -> Self {
        Self::Not(filters)
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Filter::Empty)
    }

    pub fn scalar(column: impl Into<String>, condition: ScalarCondition) -> Self {
        Self::Scalar(ScalarFilter {
            column: column.into(),
            condition,
        })
    }

    pub fn equals(column: impl Into<String>, value: impl Into<ResourceValue>) -> Self {
        Self::scalar(column, ScalarCondition::Equals(value.into()))
    }

    /// Matches rows whose `columns` equal any of the given key tuples.
    pub fn key_in(columns: Vec<String>, values: Vec<Vec<ResourceValue>>) -> Self {
        match columns.len() {
            1 => Self::scalar(
                columns.into_iter().next().unwrap_or_default(),
                ScalarCondition::In(values.into_iter().flatten().collect()),
            ),
            _ => Self::KeyIn(KeyInFilter { columns, values }),
        }
    }

    /// Matches rows whose index columns equal one of the given row fragments.
    pub fn records_in(index: &Index, records: &[Record]) -> Self {
        let values = records.iter().filter_map(|r| index.values_of(r)).collect();
        Self::key_in(index.column_names(), values)
    }

    /// Conjunction of `column = value` tests for every column of the record.
    pub fn matches_record(record: &Record) -> Self {
        Self::And(
            record
                .iter()
                .map(|(column, value)| match value {
                    ResourceValue::Null => Self::scalar(column.clone(), ScalarCondition::IsNull),
                    value => Self::equals(column.clone(), value.clone()),
                })
                .collect(),
        )
    }

    /// Combines with another filter, dropping empty sides.
    pub fn and_also(self, other: Filter) -> Self {
        match (self, other) {
            (Filter::Empty, other) => other,
            (this, Filter::Empty) => this,
            (Filter::And(mut filters), other) => {
                filters.push(other);
                Filter::And(filters)
            }
            (this, other) => Filter::And(vec![this, other]),
        }
    }

    /// All columns the filter refers to, in first-seen order.
    pub fn columns(&self) -> Vec<&str> {
        let mut columns = Vec::new();
        self.collect_columns(&mut columns);
        columns
    }

    fn collect_columns<'a>(&'a self, acc: &mut Vec<&'a str>) {
        match self {
            Filter::And(filters) | Filter::Or(filters) | Filter::Not(filters) => {
                filters.iter().for_each(|f| f.collect_columns(acc))
            }
            Filter::Scalar(sf) => push_unique(acc, &sf.column),
            Filter::KeyIn(kf) => kf.columns.iter().for_each(|c| push_unique(acc, c)),
            Filter::Empty => (),
        }
    }
}

fn push_unique<'a>(acc: &mut Vec<&'a str>, column: &'a str) {
    if !acc.contains(&column) {
        acc.push(column);
    }
}

impl From<ScalarFilter> for Filter {
    fn from(sf: ScalarFilter) -> Self {
        Filter::Scalar(sf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn single_column_key_in_becomes_scalar_in() {
        let filter = Filter::key_in(vec!["id".into()], vec![vec![1.into()], vec![2.into()]]);

        assert_eq!(
            filter,
            Filter::scalar("id", ScalarCondition::In(vec![ResourceValue::Int(1), ResourceValue::Int(2)]))
        );
    }

    #[test]
    fn and_also_skips_empty_filters() {
        let a = Filter::equals("a", 1);

        assert_eq!(Filter::empty().and_also(a.clone()), a);
        assert_eq!(a.clone().and_also(Filter::empty()), a);
        assert_eq!(
            a.clone().and_also(Filter::equals("b", 2)).columns(),
            vec!["a", "b"]
        );
    }
}
