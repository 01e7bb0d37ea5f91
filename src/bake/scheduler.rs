use std::{sync::Arc, time::Duration};

use tokio::{
    sync::watch,
    task::{JoinError, JoinSet},
    time::{Instant, Interval, MissedTickBehavior},
};

use crate::{
    bake::column::{ColumnBaker, ColumnReport},
    bake::executor::RowExecutors,
    foundation::error::{DarkroomError, DarkroomResult},
    raster::intensity::IntensityGrid,
    store::BucketStore,
};

/// What to do when a tick fires while earlier columns are still running.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Dispatch immediately; slow columns may run concurrently with later ones.
    #[default]
    Overlap,
    /// Join every running column before dispatching the next one.
    Serial,
}

#[derive(Clone, Debug)]
pub struct ScheduleOptions {
    /// Tick period; the first column fires one full period after start.
    pub period: Duration,
    pub overlap: OverlapPolicy,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            period: Duration::from_secs(1),
            overlap: OverlapPolicy::default(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BakeState {
    Idle,
    Running { cursor: u32 },
    Done,
}

/// Summary of a finished bake run.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BakeReport {
    pub columns_dispatched: u32,
    pub columns_completed: u32,
    pub rows_applied: u64,
    /// A stop signal ended the run before the last column was dispatched.
    pub cancelled: bool,
    /// Per-column reports in column order.
    pub columns: Vec<ColumnReport>,
}

/// Fires once per period and hands the next image column to a [`ColumnBaker`].
///
/// Columns are dispatched left to right as independent blocking units; the run
/// ends once the last column has been dispatched and every unit has joined. The
/// first failed column stops further dispatch and is returned from [`bake`].
///
/// [`bake`]: ColumnScheduler::bake
pub struct ColumnScheduler<S: BucketStore> {
    store: Arc<S>,
    image: Arc<IntensityGrid>,
    baker: Arc<ColumnBaker>,
    options: ScheduleOptions,
    stop: Option<watch::Receiver<bool>>,
    state: BakeState,
}

type ColumnOutcome = Result<DarkroomResult<ColumnReport>, JoinError>;

impl<S: BucketStore> ColumnScheduler<S> {
    pub fn new(
        store: Arc<S>,
        image: Arc<IntensityGrid>,
        baker: ColumnBaker,
        options: ScheduleOptions,
    ) -> Self {
        Self {
            store,
            image,
            baker: Arc::new(baker),
            options,
            stop: None,
            state: BakeState::Idle,
        }
    }

    /// Stop dispatching once `stop` reads `true`. Running columns are still joined.
    pub fn with_stop_signal(mut self, stop: watch::Receiver<bool>) -> Self {
        self.stop = Some(stop);
        self
    }

    pub fn state(&self) -> BakeState {
        self.state
    }

    /// Run the whole image, one column per tick.
    pub async fn bake(&mut self) -> DarkroomResult<BakeReport> {
        if self.state != BakeState::Idle {
            return Err(DarkroomError::validation("a scheduler can only bake once"));
        }

        if self.options.period.is_zero() {
            return Err(DarkroomError::timer("tick period must be > 0"));
        }
        let start = Instant::now();
        let deadline = start
            .checked_add(self.options.period)
            .ok_or_else(|| DarkroomError::timer("tick period overflows the clock"))?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(DarkroomError::timer("bake must run inside a tokio runtime"));
        }

        let executors = Arc::new(RowExecutors::prepare(
            self.store.as_ref(),
            self.image.height(),
        )?);

        let mut ticker = tokio::time::interval_at(deadline, self.options.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            columns = self.image.width(),
            rows = self.image.height(),
            period_ms = self.options.period.as_millis() as u64,
            overlap = ?self.options.overlap,
            "bake started"
        );
        self.state = BakeState::Running { cursor: 0 };
        let outcome = self.run(ticker, &executors).await;
        self.state = BakeState::Done;
        drop(executors);

        match &outcome {
            Ok(report) => tracing::info!(
                dispatched = report.columns_dispatched,
                completed = report.columns_completed,
                cancelled = report.cancelled,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "bake finished"
            ),
            Err(err) => tracing::error!(error = %err, "bake aborted"),
        }
        outcome
    }

    async fn run(
        &mut self,
        mut ticker: Interval,
        executors: &Arc<RowExecutors<S::Handle>>,
    ) -> DarkroomResult<BakeReport> {
        let nx = self.image.width();
        let mut inflight = JoinSet::new();
        let mut tally = Tally::default();
        let mut stop = self.stop.clone();
        let mut cursor = 0u32;

        while cursor < nx && tally.first_error.is_none() {
            tokio::select! {
                biased;
                _ = stop_requested(&mut stop) => {
                    tracing::info!(cursor, "stop requested");
                    tally.cancelled = true;
                    break;
                }
                Some(joined) = inflight.join_next(), if !inflight.is_empty() => {
                    tally.record(joined);
                }
                _ = ticker.tick() => {
                    if self.options.overlap == OverlapPolicy::Serial {
                        while !inflight.is_empty() {
                            tokio::select! {
                                biased;
                                _ = stop_requested(&mut stop) => {
                                    tracing::info!(cursor, "stop requested while joining");
                                    tally.cancelled = true;
                                    break;
                                }
                                Some(joined) = inflight.join_next() => tally.record(joined),
                            }
                        }
                        if tally.cancelled || tally.first_error.is_some() {
                            break;
                        }
                    }
                    self.dispatch(&mut inflight, cursor, executors);
                    cursor += 1;
                    self.state = BakeState::Running { cursor };
                }
            }
        }
        drop(ticker);

        while let Some(joined) = inflight.join_next().await {
            tally.record(joined);
        }
        tally.finish(cursor)
    }

    fn dispatch(
        &self,
        inflight: &mut JoinSet<DarkroomResult<ColumnReport>>,
        x: u32,
        executors: &Arc<RowExecutors<S::Handle>>,
    ) {
        let baker = Arc::clone(&self.baker);
        let image = Arc::clone(&self.image);
        let executors = Arc::clone(executors);
        tracing::debug!(column = x, "dispatching column");
        inflight.spawn_blocking(move || baker.bake_column(x, &image, &executors));
    }
}

async fn stop_requested(stop: &mut Option<watch::Receiver<bool>>) {
    match stop {
        Some(rx) => {
            // A dropped sender can never stop the run.
            if rx.wait_for(|stopped| *stopped).await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending().await,
    }
}

#[derive(Default)]
struct Tally {
    columns: Vec<ColumnReport>,
    first_error: Option<DarkroomError>,
    cancelled: bool,
}

impl Tally {
    fn record(&mut self, joined: ColumnOutcome) {
        let outcome = joined
            .map_err(|e| DarkroomError::Other(anyhow::anyhow!("column bake task failed: {e}")))
            .and_then(|res| res);
        match outcome {
            Ok(report) => self.columns.push(report),
            Err(err) if self.first_error.is_none() => {
                tracing::error!(error = %err, "column bake failed, no further columns dispatched");
                self.first_error = Some(err);
            }
            Err(err) => tracing::error!(error = %err, "column bake failed"),
        }
    }

    fn finish(mut self, dispatched: u32) -> DarkroomResult<BakeReport> {
        if let Some(err) = self.first_error {
            return Err(err);
        }
        self.columns.sort_by_key(|c| c.column);
        Ok(BakeReport {
            columns_dispatched: dispatched,
            columns_completed: self.columns.len() as u32,
            rows_applied: self.columns.iter().map(|c| u64::from(c.rows)).sum(),
            cancelled: self.cancelled,
            columns: self.columns,
        })
    }
}
