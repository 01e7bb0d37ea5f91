use rayon::prelude::*;

use crate::{
    foundation::core::{Ripeness, RowIndex},
    foundation::error::{DarkroomError, DarkroomResult},
    store::bucket::BucketStore,
};

/// Drop and recreate the schema, then fill `rows` buckets with `{0, .., R-1}`.
///
/// Must succeed before any bake run starts; every failure maps to
/// [`DarkroomError::Provisioning`].
#[tracing::instrument(skip(store))]
pub fn provision<S: BucketStore>(store: &S, rows: u32, ripeness: Ripeness) -> DarkroomResult<()> {
    store
        .reset_schema()
        .map_err(|e| DarkroomError::provisioning(format!("reset schema: {e}")))?;

    let results = (0..rows)
        .into_par_iter()
        .map(|y| {
            store
                .create_bucket(RowIndex(y), ripeness)
                .map_err(|e| (y, e))
        })
        .collect::<Vec<_>>();

    let mut failures = results.into_iter().filter_map(Result::err);
    if let Some((row, err)) = failures.next() {
        let more = failures.count();
        return Err(DarkroomError::provisioning(format!(
            "create bucket {row}: {err} ({more} more bucket(s) failed)"
        )));
    }

    tracing::info!(rows, ripeness = ripeness.0, "provisioned buckets");
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/store/provision.rs"]
mod tests;
