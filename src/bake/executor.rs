use crate::{
    foundation::core::{RowIndex, Threshold},
    foundation::error::{DarkroomError, DarkroomResult},
    store::{BucketStore, RowHandle, StoreResult},
};

/// One prepared delete bound to one row's bucket.
#[derive(Debug)]
pub struct RowExecutor<H: RowHandle> {
    handle: H,
}

impl<H: RowHandle> RowExecutor<H> {
    pub fn new(handle: H) -> Self {
        Self { handle }
    }

    pub fn row(&self) -> RowIndex {
        self.handle.row()
    }

    /// Remove every token below `threshold` from this row's bucket.
    ///
    /// Monotonicity is not checked: a threshold at or below one already applied
    /// leaves the bucket unchanged. Store failures are returned as-is, without retry.
    pub fn apply(&self, threshold: Threshold) -> StoreResult<()> {
        self.handle.execute(threshold)
    }

    pub fn close(&self) {
        self.handle.close();
    }
}

/// One [`RowExecutor`] per row, indexed by bucket.
///
/// Dropping the set closes every handle, so a bake run releases its handles on
/// every exit path.
#[derive(Debug)]
pub struct RowExecutors<H: RowHandle> {
    executors: Vec<RowExecutor<H>>,
}

impl<H: RowHandle> RowExecutors<H> {
    /// Prepare executors for buckets `0..rows`.
    pub fn prepare<S>(store: &S, rows: u32) -> DarkroomResult<Self>
    where
        S: BucketStore<Handle = H>,
    {
        let mut set = Self {
            executors: Vec::with_capacity(rows as usize),
        };
        for y in 0..rows {
            let handle = store.prepare_row_delete(RowIndex(y)).map_err(|e| {
                DarkroomError::provisioning(format!("prepare delete for bucket {y}: {e}"))
            })?;
            set.executors.push(RowExecutor::new(handle));
        }
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.executors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.executors.is_empty()
    }

    pub fn get(&self, row: RowIndex) -> Option<&RowExecutor<H>> {
        self.executors.get(row.0 as usize)
    }

    pub fn as_slice(&self) -> &[RowExecutor<H>] {
        &self.executors
    }
}

impl<H: RowHandle> Drop for RowExecutors<H> {
    fn drop(&mut self) {
        for ex in &self.executors {
            ex.close();
        }
        tracing::debug!(rows = self.executors.len(), "closed row executors");
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bake/executor.rs"]
mod tests;
