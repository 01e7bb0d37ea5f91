use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use rayon::prelude::*;

use crate::{
    bake::executor::RowExecutors,
    foundation::core::{Ripeness, Threshold, ThresholdScale},
    foundation::error::{DarkroomError, DarkroomResult},
    raster::intensity::IntensityGrid,
    store::RowHandle,
};

/// Outcome of one successfully baked column.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColumnReport {
    pub column: u32,
    /// Rows applied (one per bucket).
    pub rows: u32,
    /// Rows whose threshold reached the ripeness, i.e. buckets now empty.
    pub drained: u32,
    pub elapsed: Duration,
}

/// Turns one image column into one concurrent delete pass over every row.
#[derive(Clone, Debug)]
pub struct ColumnBaker {
    ripeness: Ripeness,
    scale: ThresholdScale,
    pool: Arc<rayon::ThreadPool>,
}

impl ColumnBaker {
    /// `threads` sizes the row fan-out pool; `None` lets rayon pick.
    pub fn new(
        ripeness: Ripeness,
        scale: ThresholdScale,
        threads: Option<usize>,
    ) -> DarkroomResult<Self> {
        Ok(Self {
            ripeness,
            scale,
            pool: Arc::new(build_thread_pool(threads)?),
        })
    }

    pub fn ripeness(&self) -> Ripeness {
        self.ripeness
    }

    pub fn scale(&self) -> ThresholdScale {
        self.scale
    }

    /// Apply column `x` to every row and join all rows before returning.
    ///
    /// Every row runs even if another row fails. The lowest failing row is
    /// returned as [`DarkroomError::Execution`]; the rest are logged.
    #[tracing::instrument(skip(self, image, executors), fields(rows = executors.len()))]
    pub fn bake_column<H: RowHandle>(
        &self,
        x: u32,
        image: &IntensityGrid,
        executors: &RowExecutors<H>,
    ) -> DarkroomResult<ColumnReport> {
        let start = Instant::now();
        let thresholds = image.column_thresholds(x, self.ripeness, self.scale)?;
        if thresholds.len() != executors.len() {
            return Err(DarkroomError::validation(format!(
                "column {x} has {} rows but {} row executors were prepared",
                thresholds.len(),
                executors.len()
            )));
        }

        let results = self.pool.install(|| {
            executors
                .as_slice()
                .par_iter()
                .zip(thresholds.par_iter())
                .map(|(ex, &t)| ex.apply(t).map_err(|e| (ex.row(), e)))
                .collect::<Vec<_>>()
        });

        let mut first = None;
        for (row, err) in results.into_iter().filter_map(Result::err) {
            if first.is_none() {
                first = Some((row, err));
            } else {
                tracing::error!(column = x, row = row.0, error = %err, "row apply failed");
            }
        }
        if let Some((row, err)) = first {
            tracing::error!(column = x, row = row.0, error = %err, "row apply failed");
            return Err(DarkroomError::execution(x, row.0, err));
        }

        let drained = thresholds
            .iter()
            .filter(|&&Threshold(t)| t >= self.ripeness.0)
            .count() as u32;
        let report = ColumnReport {
            column: x,
            rows: thresholds.len() as u32,
            drained,
            elapsed: start.elapsed(),
        };
        tracing::debug!(
            column = x,
            drained,
            elapsed_ms = report.elapsed.as_millis() as u64,
            "column baked"
        );
        Ok(report)
    }
}

fn build_thread_pool(threads: Option<usize>) -> DarkroomResult<rayon::ThreadPool> {
    let builder = rayon::ThreadPoolBuilder::new().thread_name(|i| format!("darkroom-row-{i}"));
    let builder = match threads {
        Some(0) => {
            return Err(DarkroomError::validation(
                "row fan-out 'threads' must be >= 1 when set",
            ));
        }
        Some(n) => builder.num_threads(n),
        None => builder,
    };
    builder
        .build()
        .map_err(|e| DarkroomError::validation(format!("build row fan-out pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/bake/column.rs"]
mod tests;
