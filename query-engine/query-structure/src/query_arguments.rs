use crate::{Collection, Filter, OrderBy};

/// Everything a connector needs to read a page of one collection.
#[derive(Debug, Clone)]
pub struct QueryArguments {
    pub collection: Collection,
    pub filter: Filter,
    pub order_by: Vec<OrderBy>,
    pub skip: Option<usize>,
    pub take: Option<usize>,
    pub distinct: bool,
}

impl QueryArguments {
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filter: Filter::empty(),
            order_by: vec![],
            skip: None,
            take: None,
            distinct: false,
        }
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_order_by(mut self, order_by: Vec<OrderBy>) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_take(mut self, take: Option<usize>) -> Self {
        self.take = take;
        self
    }

    pub fn with_skip(mut self, skip: Option<usize>) -> Self {
        self.skip = skip;
        self
    }

    pub fn with_distinct(mut self, distinct: bool) -> Self {
        self.distinct = distinct;
        self
    }

    /// Orders by the primary index when no explicit ordering was requested, so pages are stable.
    pub fn with_stable_order(mut self) -> Self {
        if self.order_by.is_empty() {
            self.order_by = self
                .collection
                .primary_index()
                .columns()
                .map(OrderBy::ascending)
                .collect();
        }
        self
    }

    pub fn has_window(&self) -> bool {
        self.skip.is_some() || self.take.is_some()
    }
}
