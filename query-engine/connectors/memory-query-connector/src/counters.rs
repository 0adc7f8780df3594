use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts backend round-trips per operation.
#[derive(Debug, Default)]
pub struct CallCounters {
    get_many_records: AtomicUsize,
    get_related_record_ids: AtomicUsize,
    get_link_records: AtomicUsize,
    upsert_records: AtomicUsize,
    update_records: AtomicUsize,
    delete_records: AtomicUsize,
    create_link_records: AtomicUsize,
    delete_link_records: AtomicUsize,
}

/// A point-in-time copy of [`CallCounters`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCount {
    pub get_many_records: usize,
    pub get_related_record_ids: usize,
    pub get_link_records: usize,
    pub upsert_records: usize,
    pub update_records: usize,
    pub delete_records: usize,
    pub create_link_records: usize,
    pub delete_link_records: usize,
}

impl CallCount {
    /// Round-trips that only read.
    pub fn reads(&self) -> usize {
        self.get_many_records + self.get_related_record_ids + self.get_link_records
    }

    pub fn writes(&self) -> usize {
        self.upsert_records
            + self.update_records
            + self.delete_records
            + self.create_link_records
            + self.delete_link_records
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum Operation {
    GetManyRecords,
    GetRelatedRecordIds,
    GetLinkRecords,
    UpsertRecords,
    UpdateRecords,
    DeleteRecords,
    CreateLinkRecords,
    DeleteLinkRecords,
}

impl CallCounters {
    pub(crate) fn record(&self, operation: Operation) {
        let counter = match operation {
            Operation::GetManyRecords => &self.get_many_records,
            Operation::GetRelatedRecordIds => &self.get_related_record_ids,
            Operation::GetLinkRecords => &self.get_link_records,
            Operation::UpsertRecords => &self.upsert_records,
            Operation::UpdateRecords => &self.update_records,
            Operation::DeleteRecords => &self.delete_records,
            Operation::CreateLinkRecords => &self.create_link_records,
            Operation::DeleteLinkRecords => &self.delete_link_records,
        };

        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> CallCount {
        CallCount {
            get_many_records: self.get_many_records.load(Ordering::Relaxed),
            get_related_record_ids: self.get_related_record_ids.load(Ordering::Relaxed),
            get_link_records: self.get_link_records.load(Ordering::Relaxed),
            upsert_records: self.upsert_records.load(Ordering::Relaxed),
            update_records: self.update_records.load(Ordering::Relaxed),
            delete_records: self.delete_records.load(Ordering::Relaxed),
            create_link_records: self.create_link_records.load(Ordering::Relaxed),
            delete_link_records: self.delete_link_records.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        for counter in [
            &self.get_many_records,
            &self.get_related_record_ids,
            &self.get_link_records,
            &self.upsert_records,
            &self.update_records,
            &self.delete_records,
            &self.create_link_records,
            &self.delete_link_records,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
