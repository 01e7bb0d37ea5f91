use image::{GrayImage, Luma};

use crate::{
    foundation::core::{Ripeness, RowIndex},
    foundation::error::{DarkroomError, DarkroomResult},
    store::BucketStore,
};

const PRESENT: Luma<u8> = Luma([255]);

/// Render the store as an `R x rows` picture: pixel `(v, rows-1-y)` is white
/// iff token `v` is still in bucket `y`.
pub fn render_snapshot<S: BucketStore>(
    store: &S,
    rows: u32,
    ripeness: Ripeness,
) -> DarkroomResult<GrayImage> {
    if rows == 0 || ripeness.0 == 0 {
        return Err(DarkroomError::validation(
            "snapshot needs at least one row and a non-zero ripeness",
        ));
    }

    let mut out = GrayImage::new(ripeness.0, rows);
    for y in 0..rows {
        let values = store.bucket(RowIndex(y)).map_err(|e| {
            DarkroomError::Other(anyhow::Error::new(e).context(format!("read bucket {y}")))
        })?;
        let py = rows - 1 - y;
        for v in values.into_iter().filter(|&v| v < ripeness.0) {
            out.put_pixel(v, py, PRESENT);
        }
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/raster/snapshot.rs"]
mod tests;
