use crate::foundation::core::{Ripeness, RowIndex, Threshold};

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Failures reported by a [`BucketStore`] or one of its handles.
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("store io: {0}")]
    Io(#[from] std::io::Error),

    #[error("store encoding: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("bucket {0} does not exist")]
    MissingBucket(RowIndex),

    #[error("handle for bucket {0} is closed")]
    Closed(RowIndex),

    #[error("store lock poisoned")]
    Poisoned,

    /// The store refused the command.
    #[error("store rejected command: {0}")]
    Rejected(String),
}

/// Keyed collection of row buckets.
///
/// Implementations are shared across the column fan-out and must tolerate one
/// concurrent caller per row.
pub trait BucketStore: Send + Sync + 'static {
    /// Prepared "delete from bucket `row` where value < ?" statement.
    type Handle: RowHandle;

    /// Bind a reusable delete handle to bucket `row`.
    fn prepare_row_delete(&self, row: RowIndex) -> StoreResult<Self::Handle>;

    /// Drop every bucket and recreate an empty schema.
    fn reset_schema(&self) -> StoreResult<()>;

    /// Create bucket `row` holding exactly `{0, .., ripeness-1}`.
    fn create_bucket(&self, row: RowIndex, ripeness: Ripeness) -> StoreResult<()>;

    /// Current content of bucket `row`, ascending.
    fn bucket(&self, row: RowIndex) -> StoreResult<Vec<u32>>;
}

/// Handle returned by [`BucketStore::prepare_row_delete`].
pub trait RowHandle: Send + Sync + 'static {
    /// Bucket this handle is bound to.
    fn row(&self) -> RowIndex;

    /// Remove every value strictly less than `threshold`. Atomic per call.
    fn execute(&self, threshold: Threshold) -> StoreResult<()>;

    /// Release the handle. Later `execute` calls fail with [`StoreError::Closed`].
    fn close(&self);
}
