use query_structure::{OrderBy, Record, ResourceValue, SortOrder};
use std::cmp::Ordering;

/// Sorts rows in place; nulls come first in ascending order.
pub(crate) fn sort_records(records: &mut [Record], order_by: &[OrderBy]) {
    if order_by.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        order_by
            .iter()
            .map(|ordering| {
                let left = a.get(&ordering.column).unwrap_or(&ResourceValue::Null);
                let right = b.get(&ordering.column).unwrap_or(&ResourceValue::Null);

                let ord = match (left.is_null(), right.is_null()) {
                    (true, true) => Ordering::Equal,
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (false, false) => left.compare(right),
                };

                match ordering.sort_order {
                    SortOrder::Ascending => ord,
                    SortOrder::Descending => ord.reverse(),
                }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}
