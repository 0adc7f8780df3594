use crate::{counters::CallCounters, store::Store, CallCount, MemoryConnection};
use async_trait::async_trait;
use parking_lot::Mutex;
use query_connector::{Connection, Connector};
use query_structure::{Collection, LinkTable, Record};
use std::sync::Arc;

/// In-memory connector. Clones share the same tables and counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryConnector {
    store: Arc<Mutex<Store>>,
    counters: Arc<CallCounters>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection(&self) -> MemoryConnection {
        MemoryConnection::new(self.store.clone(), self.counters.clone())
    }

    /// Seeds rows through the upsert path, generating missing keys. Not counted as calls.
    pub fn insert_records(
        &self,
        collection: &Collection,
        records: Vec<Record>,
    ) -> query_connector::Result<Vec<Record>> {
        Ok(self.store.lock().upsert_records(collection, records)?)
    }

    pub fn insert_link_records(&self, link: &LinkTable, records: Vec<Record>) -> query_connector::Result<usize> {
        Ok(self.store.lock().create_link_records(link, records, false)?)
    }

    /// Committed rows of a table, in storage order.
    pub fn records(&self, table: &str) -> Vec<Record> {
        self.store.lock().rows(table).to_vec()
    }

    pub fn calls(&self) -> CallCount {
        self.counters.snapshot()
    }

    pub fn reset_calls(&self) {
        self.counters.reset()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn get_connection(&self) -> query_connector::Result<Box<dyn Connection>> {
        Ok(Box::new(self.connection()))
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
