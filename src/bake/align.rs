use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::watch;

use crate::foundation::error::{DarkroomError, DarkroomResult};

/// Time left until the wall clock's second-of-minute reads `target`.
///
/// Zero while the clock is already inside second `target`; otherwise the delay
/// to the start of the next such second. Clocks before the Unix epoch are
/// treated as the epoch.
pub fn delay_until_second(now: SystemTime, target: u8) -> DarkroomResult<Duration> {
    if target >= 60 {
        return Err(DarkroomError::validation(format!(
            "align second must be < 60, got {target}"
        )));
    }

    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    let second = since_epoch.as_secs() % 60;
    if second == u64::from(target) {
        return Ok(Duration::ZERO);
    }

    let into_minute = Duration::new(second, since_epoch.subsec_nanos());
    let target = Duration::from_secs(u64::from(target));
    Ok(if target > into_minute {
        target - into_minute
    } else {
        Duration::from_secs(60) - (into_minute - target)
    })
}

/// Sleep until the wall clock's second-of-minute reads `target`.
///
/// Not part of a bake run; callers invoke it before starting the scheduler to
/// phase the first tick against the wall clock.
pub async fn align_to_second(target: u8) -> DarkroomResult<()> {
    let delay = delay_until_second(SystemTime::now(), target)?;
    tracing::info!(target, delay_ms = delay.as_millis() as u64, "aligning to wall clock");
    tokio::time::sleep(delay).await;
    Ok(())
}

/// [`align_to_second`] that gives up once `stop` reads `true`.
///
/// Returns `false` when the wait was cut short. A dropped sender never stops
/// the wait.
pub async fn align_to_second_or_stop(
    target: u8,
    stop: &mut watch::Receiver<bool>,
) -> DarkroomResult<bool> {
    let delay = delay_until_second(SystemTime::now(), target)?;
    tracing::info!(target, delay_ms = delay.as_millis() as u64, "aligning to wall clock");
    tokio::select! {
        biased;
        Ok(_) = stop.wait_for(|stopped| *stopped) => {
            tracing::info!(target, "stop requested while aligning");
            Ok(false)
        }
        _ = tokio::time::sleep(delay) => Ok(true),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/bake/align.rs"]
mod tests;
