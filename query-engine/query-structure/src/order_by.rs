#[derive(Clone, Copy, PartialEq, Debug, Eq, Hash)]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn abbreviated(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderBy {
    pub column: String,
    pub sort_order: SortOrder,
}

impl OrderBy {
    pub fn new(column: impl Into<String>, sort_order: SortOrder) -> Self {
        Self {
            column: column.into(),
            sort_order,
        }
    }

    pub fn ascending(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Ascending)
    }

    pub fn descending(column: impl Into<String>) -> Self {
        Self::new(column, SortOrder::Descending)
    }
}
