//! darkroom develops a raster image into a store of shrinking token buckets.
//!
//! Every image row owns a bucket holding `{0, .., R-1}` (`R` is the *ripeness*).
//! Once per wall-clock tick one image column is processed: for each row, every
//! token below `floor(R / 256 * intensity)` is deleted. Bright pixels eat their
//! bucket away, dark pixels leave it alone, and the picture "develops" in the
//! store over real time.
//!
//! # Pipeline overview
//!
//! 1. **Provision**: [`provision`] drops and refills every bucket.
//! 2. **Prepare**: [`RowExecutors::prepare`] binds one delete handle per row.
//! 3. **Tick**: [`ColumnScheduler::bake`] fires once per period and dispatches the
//!    next column as an independent blocking unit.
//! 4. **Fan out**: [`ColumnBaker::bake_column`] applies the column to every row
//!    concurrently and joins them.
//!
//! Bucket `y` reads pixel row `ny-1-y`: the top of the image lands in the last bucket.
//!
//! Thresholds only ever remove tokens. The "developing" effect assumes
//! brightness does not decrease from one column to the next for a given row;
//! that is up to the caller's image, nothing here enforces it.
#![forbid(unsafe_code)]

mod bake;
mod config;
mod foundation;
mod raster;
mod store;

pub use bake::align::{align_to_second, align_to_second_or_stop, delay_until_second};
pub use bake::column::{ColumnBaker, ColumnReport};
pub use bake::executor::{RowExecutor, RowExecutors};
pub use bake::scheduler::{BakeReport, BakeState, ColumnScheduler, OverlapPolicy, ScheduleOptions};
pub use config::BakeConfig;
pub use foundation::core::{MAX_COLOR, Ripeness, RowIndex, Threshold, ThresholdScale};
pub use foundation::error::{DarkroomError, DarkroomResult};
pub use raster::intensity::IntensityGrid;
pub use raster::snapshot::render_snapshot;
pub use store::dir::{DirRowHandle, DirStore};
pub use store::memory::{MemoryRowHandle, MemoryStore};
pub use store::provision::provision;
pub use store::{BucketStore, RowHandle, StoreError, StoreResult};
