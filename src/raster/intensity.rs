use std::path::Path;

use image::GrayImage;

use crate::foundation::{
    core::{Ripeness, Threshold, ThresholdScale},
    error::{DarkroomError, DarkroomResult},
};

/// Immutable grid of 8-bit grayscale samples.
///
/// Columns map to time steps, rows map to buckets.
#[derive(Clone, Debug)]
pub struct IntensityGrid {
    pixels: GrayImage,
}

impl IntensityGrid {
    /// Decode an image file and convert it to grayscale.
    pub fn open(path: impl AsRef<Path>) -> DarkroomResult<Self> {
        let path = path.as_ref();
        let img = image::open(path)
            .map_err(|e| DarkroomError::image(format!("open '{}': {e}", path.display())))?;
        Ok(Self::from_gray(img.to_luma8()))
    }

    /// Decode encoded image bytes (any format enabled in `image`).
    pub fn decode(bytes: &[u8]) -> DarkroomResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| DarkroomError::image(format!("decode image from memory: {e}")))?;
        Ok(Self::from_gray(img.to_luma8()))
    }

    pub fn from_gray(pixels: GrayImage) -> Self {
        Self { pixels }
    }

    /// Build from row-major samples (`samples[y * width + x]`).
    pub fn from_rows(width: u32, height: u32, samples: Vec<u8>) -> DarkroomResult<Self> {
        let pixels = GrayImage::from_raw(width, height, samples).ok_or_else(|| {
            DarkroomError::validation(format!(
                "sample buffer does not match a {width}x{height} grid"
            ))
        })?;
        Ok(Self { pixels })
    }

    /// Number of columns (`nx`).
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Number of rows (`ny`).
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Sample at pixel-space `(x, y)`; `y = 0` is the top row.
    ///
    /// Panics if `(x, y)` is outside the grid.
    pub fn intensity(&self, x: u32, y: u32) -> u8 {
        self.pixels.get_pixel(x, y).0[0]
    }

    /// Threshold for bucket `row` at column `x`.
    ///
    /// Bucket `row` reads pixel row `ny-1-row`, so the top of the image lands
    /// in the last bucket.
    ///
    /// Panics if `x` or `row` is outside the grid; [`column_thresholds`]
    /// is the checked form.
    ///
    /// [`column_thresholds`]: IntensityGrid::column_thresholds
    pub fn threshold(
        &self,
        x: u32,
        row: u32,
        ripeness: Ripeness,
        scale: ThresholdScale,
    ) -> Threshold {
        assert!(
            row < self.height(),
            "row {row} out of range for height {}",
            self.height()
        );
        let flipped = self.height() - 1 - row;
        scale.threshold(ripeness, self.intensity(x, flipped))
    }

    /// Thresholds for every bucket at column `x`, indexed by bucket.
    pub fn column_thresholds(
        &self,
        x: u32,
        ripeness: Ripeness,
        scale: ThresholdScale,
    ) -> DarkroomResult<Vec<Threshold>> {
        if x >= self.width() {
            return Err(DarkroomError::validation(format!(
                "column {x} out of range for width {}",
                self.width()
            )));
        }
        Ok((0..self.height())
            .map(|row| self.threshold(x, row, ripeness, scale))
            .collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/intensity.rs"]
mod tests;
