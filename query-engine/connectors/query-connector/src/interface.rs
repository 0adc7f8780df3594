use async_trait::async_trait;
use query_structure::*;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Returns a connection to a data source.
    async fn get_connection(&self) -> crate::Result<Box<dyn Connection>>;

    /// Returns name of the connector.
    fn name(&self) -> &'static str;
}

#[async_trait]
pub trait Connection: ConnectionLike {
    async fn start_transaction<'a>(&'a self) -> crate::Result<Box<dyn Transaction + 'a>>;

    /// Explicit upcast.
    fn as_connection_like(&self) -> &dyn ConnectionLike;
}

#[async_trait]
pub trait Transaction: ConnectionLike {
    async fn commit(&self) -> crate::Result<()>;
    async fn rollback(&self) -> crate::Result<()>;

    /// Explicit upcast of self reference. Rusts current vtable layout doesn't allow for an upcast if
    /// `trait A`, `trait B: A`, so that `Box<dyn B> as Box<dyn A>` works. This is a simple, explicit workaround.
    fn as_connection_like(&self) -> &dyn ConnectionLike;
}

/// Marker trait required by the query core to abstract connections and
/// transactions into something that can is capable of writing to or reading from the backend.
pub trait ConnectionLike: ReadOperations + WriteOperations + Send + Sync {}

/// A wrapper struct allowing to either filter for records or for the core to
/// communicate already known record selectors to connectors.
///
/// Connector implementations should use known selectors to skip unnecessary fetch operations
/// if the query core already determined the selectors in a previous step. Simply put,
/// `selectors` should always have precendence over `filter`.
#[derive(Debug, Clone)]
pub struct RecordFilter {
    pub filter: Filter,
    pub selectors: Option<Vec<Record>>,
}

impl RecordFilter {
    pub fn empty() -> Self {
        Self {
            filter: Filter::empty(),
            selectors: None,
        }
    }

    pub fn has_selectors(&self) -> bool {
        self.selectors.is_some()
    }

    /// Folds the selectors into a plain filter over the given index.
    pub fn into_filter(self, index: &Index) -> Filter {
        match self.selectors {
            Some(selectors) => Filter::records_in(index, &selectors),
            None => self.filter,
        }
    }
}

impl From<Filter> for RecordFilter {
    fn from(filter: Filter) -> Self {
        Self {
            filter,
            selectors: None,
        }
    }
}

impl From<Vec<Record>> for RecordFilter {
    fn from(selectors: Vec<Record>) -> Self {
        Self {
            filter: Filter::empty(),
            selectors: Some(selectors),
        }
    }
}

/// One matching pair of a relationship: the parent's and the child's primary key fragments.
pub type RelatedRecordIds = (Record, Record);

#[async_trait]
pub trait ReadOperations {
    /// Gets multiple records from the backend.
    ///
    /// - The `QueryArguments` carry the collection, the filter, ordering and the page window.
    /// - Returned records contain every stored column, keyed by column name.
    async fn get_many_records(&self, query_arguments: QueryArguments) -> crate::Result<Vec<Record>>;

    /// Retrieves pairs of primary key fragments that are related by `relationship`, for all of
    /// the given parents at once.
    ///
    /// - Parent fragments are keyed by the owning collection's primary index columns.
    /// - Child fragments are keyed by the related collection's primary index columns.
    async fn get_related_record_ids(
        &self,
        relationship: &Relationship,
        parents: &[Record],
    ) -> crate::Result<Vec<RelatedRecordIds>>;

    /// Reads rows of a many-to-many link table.
    async fn get_link_records(
        &self,
        link: &LinkTable,
        filter: Filter,
        take: Option<usize>,
    ) -> crate::Result<Vec<Record>>;
}

#[async_trait]
pub trait WriteOperations {
    /// Inserts or updates records by primary key, in one batch. Records without a primary key, or
    /// whose key does not exist yet, are created; missing key columns are generated.
    /// Returns the stored rows in input order.
    async fn upsert_records(&self, collection: &Collection, records: Vec<Record>) -> crate::Result<Vec<Record>>;

    /// Sets the given column values on every matching record. Returns the number of affected rows.
    async fn update_records(
        &self,
        collection: &Collection,
        record_filter: RecordFilter,
        values: Record,
    ) -> crate::Result<usize>;

    /// Deletes every matching record. Returns the number of affected rows.
    async fn delete_records(&self, collection: &Collection, record_filter: RecordFilter) -> crate::Result<usize>;

    /// Inserts link rows. With `skip_duplicates`, rows that already exist are ignored instead of
    /// failing. Returns the number of inserted rows.
    async fn create_link_records(
        &self,
        link: &LinkTable,
        records: Vec<Record>,
        skip_duplicates: bool,
    ) -> crate::Result<usize>;

    /// Deletes matching link rows. Returns the number of affected rows.
    async fn delete_link_records(&self, link: &LinkTable, filter: Filter) -> crate::Result<usize>;
}
