use super::*;
use crate::{
    foundation::core::RowIndex,
    store::{
        BucketStore, StoreError, StoreResult,
        memory::{MemoryRowHandle, MemoryStore},
        provision::provision,
    },
};

/// Fails every execute on one row.
struct FaultyStore {
    inner: MemoryStore,
    fail_row: RowIndex,
}

struct FaultyHandle {
    inner: MemoryRowHandle,
    fail: bool,
}

impl RowHandle for FaultyHandle {
    fn row(&self) -> RowIndex {
        self.inner.row()
    }

    fn execute(&self, threshold: Threshold) -> StoreResult<()> {
        if self.fail {
            return Err(StoreError::Rejected("injected".to_string()));
        }
        self.inner.execute(threshold)
    }

    fn close(&self) {
        self.inner.close();
    }
}

impl BucketStore for FaultyStore {
    type Handle = FaultyHandle;

    fn prepare_row_delete(&self, row: RowIndex) -> StoreResult<Self::Handle> {
        Ok(FaultyHandle {
            inner: self.inner.prepare_row_delete(row)?,
            fail: row == self.fail_row,
        })
    }

    fn reset_schema(&self) -> StoreResult<()> {
        self.inner.reset_schema()
    }

    fn create_bucket(&self, row: RowIndex, ripeness: Ripeness) -> StoreResult<()> {
        self.inner.create_bucket(row, ripeness)
    }

    fn bucket(&self, row: RowIndex) -> StoreResult<Vec<u32>> {
        self.inner.bucket(row)
    }
}

fn grid(width: u32, height: u32, samples: &[u8]) -> IntensityGrid {
    IntensityGrid::from_rows(width, height, samples.to_vec()).unwrap()
}

/// Bucket contents after each column, indexed `[x][y]`.
fn bake_all(
    store: &MemoryStore,
    image: &IntensityGrid,
    baker: &ColumnBaker,
) -> Vec<Vec<Vec<u32>>> {
    let executors = RowExecutors::prepare(store, image.height()).unwrap();
    (0..image.width())
        .map(|x| {
            baker.bake_column(x, image, &executors).unwrap();
            (0..image.height())
                .map(|y| store.bucket(RowIndex(y)).unwrap())
                .collect()
        })
        .collect()
}

#[test]
fn single_row_develops_column_by_column() {
    let image = grid(3, 1, &[0, 128, 255]);

    let store = MemoryStore::new();
    provision(&store, 1, Ripeness(10)).unwrap();
    let full = ColumnBaker::new(Ripeness(10), ThresholdScale::Full, Some(2)).unwrap();
    let states = bake_all(&store, &image, &full);
    assert_eq!(states[0][0], (0..10).collect::<Vec<_>>());
    assert_eq!(states[1][0], (5..10).collect::<Vec<_>>());
    assert!(states[2][0].is_empty());

    let store = MemoryStore::new();
    provision(&store, 1, Ripeness(10)).unwrap();
    let byte = ColumnBaker::new(Ripeness(10), ThresholdScale::Byte, Some(2)).unwrap();
    let states = bake_all(&store, &image, &byte);
    assert_eq!(states[1][0], (5..10).collect::<Vec<_>>());
    assert_eq!(states[2][0], vec![9]);
}

#[test]
fn white_top_pixel_drains_last_bucket() {
    let image = grid(1, 2, &[255, 0]);
    let store = MemoryStore::new();
    provision(&store, 2, Ripeness(4)).unwrap();
    let baker = ColumnBaker::new(Ripeness(4), ThresholdScale::Full, None).unwrap();
    let executors = RowExecutors::prepare(&store, 2).unwrap();

    let report = baker.bake_column(0, &image, &executors).unwrap();
    assert_eq!(report.column, 0);
    assert_eq!(report.rows, 2);
    assert_eq!(report.drained, 1);
    assert_eq!(store.bucket(RowIndex(0)).unwrap(), vec![0, 1, 2, 3]);
    assert!(store.bucket(RowIndex(1)).unwrap().is_empty());
}

#[test]
fn monotonic_columns_leave_values_at_or_above_threshold() {
    // pixel rows 0..3, brightness never decreases left to right
    let samples = [
        0, 10, 10, 200, //
        5, 60, 120, 255, //
        0, 0, 0, 0, //
    ];
    let image = grid(4, 3, &samples);
    let r = Ripeness(50);
    let store = MemoryStore::new();
    provision(&store, 3, r).unwrap();
    let baker = ColumnBaker::new(r, ThresholdScale::Byte, Some(3)).unwrap();

    let states = bake_all(&store, &image, &baker);
    for (x, rows) in states.iter().enumerate() {
        for (y, bucket) in rows.iter().enumerate() {
            let t = image.threshold(x as u32, y as u32, r, ThresholdScale::Byte);
            let expected: Vec<u32> = r.tokens().filter(|&v| v >= t.0).collect();
            assert_eq!(bucket, &expected, "x={x} y={y}");
        }
    }
}

#[test]
fn failing_row_is_reported_and_other_rows_still_apply() {
    let image = grid(1, 3, &[255, 255, 255]);
    let store = FaultyStore {
        inner: MemoryStore::new(),
        fail_row: RowIndex(1),
    };
    provision(&store, 3, Ripeness(8)).unwrap();
    let baker = ColumnBaker::new(Ripeness(8), ThresholdScale::Full, Some(3)).unwrap();
    let executors = RowExecutors::prepare(&store, 3).unwrap();

    let err = baker.bake_column(0, &image, &executors).unwrap_err();
    assert_eq!(err.failed_cell(), Some((0, 1)));
    assert!(store.bucket(RowIndex(0)).unwrap().is_empty());
    assert_eq!(store.bucket(RowIndex(1)).unwrap().len(), 8);
    assert!(store.bucket(RowIndex(2)).unwrap().is_empty());
}

#[test]
fn executor_count_must_match_image_height() {
    let image = grid(1, 3, &[1, 2, 3]);
    let store = MemoryStore::new();
    provision(&store, 2, Ripeness(8)).unwrap();
    let baker = ColumnBaker::new(Ripeness(8), ThresholdScale::Byte, None).unwrap();
    let executors = RowExecutors::prepare(&store, 2).unwrap();
    let err = baker.bake_column(0, &image, &executors).unwrap_err();
    assert!(matches!(err, DarkroomError::Validation(_)));
}

#[test]
fn zero_threads_is_rejected() {
    let err = ColumnBaker::new(Ripeness(8), ThresholdScale::Byte, Some(0)).unwrap_err();
    assert!(matches!(err, DarkroomError::Validation(_)));
}
