// libs/scheduling-cell/src/services/allocator.rs
//
// Deterministic sub-slot selection within the requested hour. The
// allocator never reads the store itself; the coordinator hands it the
// conflict set from a single read, and the commit re-checks under the
// store's uniqueness guarantee.

use chrono::{NaiveTime, Timelike};

use crate::models::SchedulingError;
use crate::services::capacity::sub_slot_times;

/// Pick the sub-slot to book within the requested hour.
///
/// The exact requested time wins when it lands on a sub-slot boundary
/// and is free; otherwise the earliest free sub-slot of that hour is
/// taken. A full hour is `HourFullyBooked`.
pub fn allocate(
    requested: NaiveTime,
    taken_times: &[NaiveTime],
    slot_period: i32,
) -> Result<NaiveTime, SchedulingError> {
    let candidates = sub_slot_times(requested.hour(), slot_period);

    let is_free = |t: &NaiveTime| !taken_times.contains(t);

    if candidates.contains(&requested) && is_free(&requested) {
        return Ok(requested);
    }

    candidates
        .into_iter()
        .find(is_free)
        .ok_or(SchedulingError::HourFullyBooked)
}
