pub mod bucket;
pub mod dir;
pub mod memory;
pub mod provision;

pub use bucket::{BucketStore, RowHandle, StoreError, StoreResult};
