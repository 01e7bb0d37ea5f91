use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    foundation::core::{Ripeness, RowIndex, Threshold},
    store::bucket::{BucketStore, RowHandle, StoreError, StoreResult},
};

type Bucket = Arc<Mutex<BTreeSet<u32>>>;

/// In-process bucket store.
///
/// Handles keep their bucket alive through an `Arc`, so a handle prepared
/// before [`BucketStore::reset_schema`] keeps operating on the dropped bucket.
#[derive(Debug, Default)]
pub struct MemoryStore {
    buckets: Mutex<BTreeMap<RowIndex, Bucket>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets currently in the schema.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.buckets.lock().map_err(|_| StoreError::Poisoned)?.len())
    }

    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }

    fn lookup(&self, row: RowIndex) -> StoreResult<Bucket> {
        let buckets = self.buckets.lock().map_err(|_| StoreError::Poisoned)?;
        buckets
            .get(&row)
            .cloned()
            .ok_or(StoreError::MissingBucket(row))
    }
}

impl BucketStore for MemoryStore {
    type Handle = MemoryRowHandle;

    fn prepare_row_delete(&self, row: RowIndex) -> StoreResult<Self::Handle> {
        Ok(MemoryRowHandle {
            row,
            bucket: self.lookup(row)?,
            closed: AtomicBool::new(false),
        })
    }

    fn reset_schema(&self) -> StoreResult<()> {
        self.buckets
            .lock()
            .map_err(|_| StoreError::Poisoned)?
            .clear();
        Ok(())
    }

    fn create_bucket(&self, row: RowIndex, ripeness: Ripeness) -> StoreResult<()> {
        let bucket = Arc::new(Mutex::new(ripeness.tokens().collect::<BTreeSet<_>>()));
        let mut buckets = self.buckets.lock().map_err(|_| StoreError::Poisoned)?;
        if buckets.contains_key(&row) {
            return Err(StoreError::Rejected(format!("bucket {row} already exists")));
        }
        buckets.insert(row, bucket);
        Ok(())
    }

    fn bucket(&self, row: RowIndex) -> StoreResult<Vec<u32>> {
        let bucket = self.lookup(row)?;
        let values = bucket.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(values.iter().copied().collect())
    }
}

/// Delete handle bound to one [`MemoryStore`] bucket.
#[derive(Debug)]
pub struct MemoryRowHandle {
    row: RowIndex,
    bucket: Bucket,
    closed: AtomicBool,
}

impl RowHandle for MemoryRowHandle {
    fn row(&self) -> RowIndex {
        self.row
    }

    fn execute(&self, threshold: Threshold) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed(self.row));
        }
        let mut values = self.bucket.lock().map_err(|_| StoreError::Poisoned)?;
        let kept = values.split_off(&threshold.0);
        *values = kept;
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/memory.rs"]
mod tests;
