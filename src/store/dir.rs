use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Write as _},
    path::{Path, PathBuf},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    foundation::core::{Ripeness, RowIndex, Threshold},
    store::bucket::{BucketStore, RowHandle, StoreError, StoreResult},
};

/// Persistent store keeping one JSON file per bucket.
///
/// Layout: `<root>/<name>/t_<row>.json`, each file a sorted JSON array of the
/// tokens still present in that bucket.
#[derive(Debug)]
pub struct DirStore {
    schema_dir: PathBuf,
    row_locks: Mutex<BTreeMap<RowIndex, Arc<Mutex<()>>>>,
}

impl DirStore {
    /// Open (without creating) schema `name` under `root`.
    pub fn open(root: impl AsRef<Path>, name: &str) -> StoreResult<Self> {
        if !is_schema_name(name) {
            return Err(StoreError::Rejected(format!(
                "schema name '{name}' must be non-empty ASCII alphanumeric or '_'"
            )));
        }
        Ok(Self {
            schema_dir: root.as_ref().join(name),
            row_locks: Mutex::new(BTreeMap::new()),
        })
    }

    pub fn schema_dir(&self) -> &Path {
        &self.schema_dir
    }

    fn bucket_path(&self, row: RowIndex) -> PathBuf {
        bucket_path(&self.schema_dir, row)
    }

    fn row_lock(&self, row: RowIndex) -> StoreResult<Arc<Mutex<()>>> {
        let mut locks = self.row_locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(locks.entry(row).or_default().clone())
    }
}

pub(crate) fn is_schema_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn bucket_path(schema_dir: &Path, row: RowIndex) -> PathBuf {
    schema_dir.join(format!("t_{}.json", row.0))
}

fn read_bucket(path: &Path, row: RowIndex) -> StoreResult<Vec<u32>> {
    let f = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::MissingBucket(row));
        }
        Err(e) => return Err(e.into()),
    };
    Ok(serde_json::from_reader(BufReader::new(f))?)
}

fn write_bucket(path: &Path, values: &[u32]) -> StoreResult<()> {
    let tmp = path.with_extension("json.tmp");
    {
        let mut w = BufWriter::new(File::create(&tmp)?);
        serde_json::to_writer(&mut w, values)?;
        w.flush()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

impl BucketStore for DirStore {
    type Handle = DirRowHandle;

    fn prepare_row_delete(&self, row: RowIndex) -> StoreResult<Self::Handle> {
        let path = self.bucket_path(row);
        if !path.is_file() {
            return Err(StoreError::MissingBucket(row));
        }
        Ok(DirRowHandle {
            row,
            path,
            lock: self.row_lock(row)?,
            closed: AtomicBool::new(false),
        })
    }

    fn reset_schema(&self) -> StoreResult<()> {
        if self.schema_dir.exists() {
            std::fs::remove_dir_all(&self.schema_dir)?;
        }
        std::fs::create_dir_all(&self.schema_dir)?;
        Ok(())
    }

    fn create_bucket(&self, row: RowIndex, ripeness: Ripeness) -> StoreResult<()> {
        let path = self.bucket_path(row);
        if path.exists() {
            return Err(StoreError::Rejected(format!("bucket {row} already exists")));
        }
        let lock = self.row_lock(row)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
        write_bucket(&path, &ripeness.tokens().collect::<Vec<_>>())
    }

    fn bucket(&self, row: RowIndex) -> StoreResult<Vec<u32>> {
        read_bucket(&self.bucket_path(row), row)
    }
}

/// Delete handle bound to one [`DirStore`] bucket file.
#[derive(Debug)]
pub struct DirRowHandle {
    row: RowIndex,
    path: PathBuf,
    lock: Arc<Mutex<()>>,
    closed: AtomicBool,
}

impl RowHandle for DirRowHandle {
    fn row(&self) -> RowIndex {
        self.row
    }

    fn execute(&self, threshold: Threshold) -> StoreResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed(self.row));
        }
        let _guard = self.lock.lock().map_err(|_| StoreError::Poisoned)?;
        let values = read_bucket(&self.path, self.row)?;
        let cut = values.partition_point(|&v| v < threshold.0);
        if cut == 0 {
            return Ok(());
        }
        write_bucket(&self.path, &values[cut..])
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/dir.rs"]
mod tests;
