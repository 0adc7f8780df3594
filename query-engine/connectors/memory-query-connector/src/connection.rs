use crate::{
    counters::{CallCounters, Operation},
    store::Store,
    MemoryError,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use query_connector::{
    Connection, ConnectionLike, ReadOperations, RecordFilter, RelatedRecordIds, Transaction, WriteOperations,
};
use query_structure::*;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

/// A handle on the in-memory store. Outside of a transaction it reads and writes the shared store
/// directly; a transaction works on a private copy that replaces its parent's state on commit.
pub struct MemoryConnection {
    parent: Arc<Mutex<Store>>,
    working: Arc<Mutex<Store>>,
    counters: Arc<CallCounters>,
    in_transaction: bool,
    closed: AtomicBool,
}

impl MemoryConnection {
    pub(crate) fn new(store: Arc<Mutex<Store>>, counters: Arc<CallCounters>) -> Self {
        Self {
            parent: store.clone(),
            working: store,
            counters,
            in_transaction: false,
            closed: AtomicBool::new(false),
        }
    }

    fn transaction_of(&self) -> Self {
        let snapshot = self.working.lock().clone();

        Self {
            parent: self.working.clone(),
            working: Arc::new(Mutex::new(snapshot)),
            counters: self.counters.clone(),
            in_transaction: true,
            closed: AtomicBool::new(false),
        }
    }

    fn guard(&self, operation: Operation) -> query_connector::Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(MemoryError::TransactionClosed.into());
        }

        self.counters.record(operation);
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn start_transaction<'a>(&'a self) -> query_connector::Result<Box<dyn Transaction + 'a>> {
        tracing::debug!("starting in-memory transaction");
        Ok(Box::new(self.transaction_of()))
    }

    fn as_connection_like(&self) -> &dyn ConnectionLike {
        self
    }
}

#[async_trait]
impl Transaction for MemoryConnection {
    async fn commit(&self) -> query_connector::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(MemoryError::TransactionClosed.into());
        }

        if self.in_transaction {
            let state = self.working.lock().clone();
            *self.parent.lock() = state;
        }

        Ok(())
    }

    async fn rollback(&self) -> query_connector::Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(MemoryError::TransactionClosed.into());
        }

        tracing::debug!("rolled back in-memory transaction");
        Ok(())
    }

    fn as_connection_like(&self) -> &dyn ConnectionLike {
        self
    }
}

impl ConnectionLike for MemoryConnection {}

#[async_trait]
impl ReadOperations for MemoryConnection {
    async fn get_many_records(&self, query_arguments: QueryArguments) -> query_connector::Result<Vec<Record>> {
        self.guard(Operation::GetManyRecords)?;

        let records = self.working.lock().get_many_records(&query_arguments)?;
        tracing::trace!(collection = query_arguments.collection.name(), count = records.len(), "read records");

        Ok(records)
    }

    async fn get_related_record_ids(
        &self,
        relationship: &Relationship,
        parents: &[Record],
    ) -> query_connector::Result<Vec<RelatedRecordIds>> {
        self.guard(Operation::GetRelatedRecordIds)?;

        Ok(self.working.lock().get_related_record_ids(relationship, parents)?)
    }

    async fn get_link_records(
        &self,
        link: &LinkTable,
        filter: Filter,
        take: Option<usize>,
    ) -> query_connector::Result<Vec<Record>> {
        self.guard(Operation::GetLinkRecords)?;

        Ok(self.working.lock().get_link_records(link, &filter, take)?)
    }
}

#[async_trait]
impl WriteOperations for MemoryConnection {
    async fn upsert_records(
        &self,
        collection: &Collection,
        records: Vec<Record>,
    ) -> query_connector::Result<Vec<Record>> {
        self.guard(Operation::UpsertRecords)?;

        Ok(self.working.lock().upsert_records(collection, records)?)
    }

    async fn update_records(
        &self,
        collection: &Collection,
        record_filter: RecordFilter,
        values: Record,
    ) -> query_connector::Result<usize> {
        self.guard(Operation::UpdateRecords)?;

        let filter = record_filter.into_filter(collection.primary_index());
        Ok(self.working.lock().update_records(collection, &filter, &values)?)
    }

    async fn delete_records(
        &self,
        collection: &Collection,
        record_filter: RecordFilter,
    ) -> query_connector::Result<usize> {
        self.guard(Operation::DeleteRecords)?;

        let filter = record_filter.into_filter(collection.primary_index());
        Ok(self.working.lock().delete_records(collection.db_name(), &filter)?)
    }

    async fn create_link_records(
        &self,
        link: &LinkTable,
        records: Vec<Record>,
        skip_duplicates: bool,
    ) -> query_connector::Result<usize> {
        self.guard(Operation::CreateLinkRecords)?;

        Ok(self.working.lock().create_link_records(link, records, skip_duplicates)?)
    }

    async fn delete_link_records(&self, link: &LinkTable, filter: Filter) -> query_connector::Result<usize> {
        self.guard(Operation::DeleteLinkRecords)?;

        Ok(self.working.lock().delete_records(&link.table, &filter)?)
    }
}
