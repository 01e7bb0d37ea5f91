use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::Context as _;

use crate::{
    bake::column::ColumnBaker,
    bake::scheduler::{OverlapPolicy, ScheduleOptions},
    foundation::core::{Ripeness, ThresholdScale},
    foundation::error::{DarkroomError, DarkroomResult},
    store::dir::is_schema_name,
};

fn default_interval_secs() -> f64 {
    1.0
}

/// Settings of one develop run, loadable from JSON.
///
/// ```json
/// { "name": "sunset", "image": "sunset.png", "ripeness": 256, "interval_secs": 60 }
/// ```
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BakeConfig {
    /// Schema name; becomes the store directory.
    pub name: String,
    /// Source image. Relative paths in a config file resolve against the file's directory.
    pub image: PathBuf,
    pub ripeness: Ripeness,
    #[serde(default = "default_interval_secs")]
    pub interval_secs: f64,
    #[serde(default)]
    pub overlap: OverlapPolicy,
    #[serde(default)]
    pub scale: ThresholdScale,
    /// Row fan-out threads; rayon's default when unset. Checked by
    /// [`BakeConfig::column_baker`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threads: Option<usize>,
    /// Second-of-minute to wait for before the first tick.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align_second: Option<u8>,
}

impl BakeConfig {
    pub fn new(name: impl Into<String>, image: impl Into<PathBuf>, ripeness: Ripeness) -> Self {
        Self {
            name: name.into(),
            image: image.into(),
            ripeness,
            interval_secs: default_interval_secs(),
            overlap: OverlapPolicy::default(),
            scale: ThresholdScale::default(),
            threads: None,
            align_second: None,
        }
    }

    /// Read and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> DarkroomResult<Self> {
        let path = path.as_ref();
        let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
        let mut cfg: Self = serde_json::from_reader(BufReader::new(f))
            .with_context(|| format!("parse config JSON '{}'", path.display()))?;
        if cfg.image.is_relative()
            && let Some(dir) = path.parent()
        {
            cfg.image = dir.join(&cfg.image);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> DarkroomResult<()> {
        if !is_schema_name(&self.name) {
            return Err(DarkroomError::validation(format!(
                "name '{}' must be non-empty ASCII alphanumeric or '_'",
                self.name
            )));
        }
        self.period()?;
        if let Some(s) = self.align_second
            && s >= 60
        {
            return Err(DarkroomError::validation(format!(
                "align_second must be < 60, got {s}"
            )));
        }
        Ok(())
    }

    /// Tick period derived from `interval_secs`.
    pub fn period(&self) -> DarkroomResult<Duration> {
        if !(self.interval_secs.is_finite() && self.interval_secs > 0.0) {
            return Err(DarkroomError::validation(format!(
                "interval_secs must be finite and > 0, got {}",
                self.interval_secs
            )));
        }
        Duration::try_from_secs_f64(self.interval_secs)
            .map_err(|e| DarkroomError::validation(format!("interval_secs: {e}")))
    }

    pub fn schedule_options(&self) -> DarkroomResult<ScheduleOptions> {
        Ok(ScheduleOptions {
            period: self.period()?,
            overlap: self.overlap,
        })
    }

    pub fn column_baker(&self) -> DarkroomResult<ColumnBaker> {
        ColumnBaker::new(self.ripeness, self.scale, self.threads)
    }
}

#[cfg(test)]
#[path = "../tests/unit/config.rs"]
mod tests;
