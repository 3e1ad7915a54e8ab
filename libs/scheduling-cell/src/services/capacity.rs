// libs/scheduling-cell/src/services/capacity.rs
//
// Pure capacity arithmetic. Nothing here touches the store.

use chrono::NaiveTime;

use crate::models::SchedulingError;

pub const ALLOWED_SLOT_PERIODS: [i32; 5] = [10, 15, 20, 30, 60];
pub const DEFAULT_SLOT_PERIOD_MINUTES: i32 = 15;

/// Reporting window when a doctor has published no slots for the day.
pub const DEFAULT_WORKING_HOURS: std::ops::Range<u32> = 9..22;

pub fn validate_slot_period(period: i32) -> Result<(), SchedulingError> {
    if ALLOWED_SLOT_PERIODS.contains(&period) {
        Ok(())
    } else {
        Err(SchedulingError::InvalidSlotPeriod(period))
    }
}

/// How many bookings one hour holds at the given slot period.
pub fn capacity_per_hour(period: i32) -> i32 {
    (60 / period).max(1)
}

/// Minute offsets of the sub-slots within any hour: `[0, p, 2p, ...] < 60`.
pub fn sub_slot_offsets(period: i32) -> Vec<u32> {
    (0..60).step_by(period as usize).collect()
}

/// The bookable times within one hour.
pub fn sub_slot_times(hour: u32, period: i32) -> Vec<NaiveTime> {
    sub_slot_offsets(period)
        .into_iter()
        .filter_map(|minute| NaiveTime::from_hms_opt(hour, minute, 0))
        .collect()
}

/// Zero-padded `HH:00` labels bounding one reporting hour.
pub fn hour_labels(hour: u32) -> (String, String) {
    (format!("{:02}:00", hour), format!("{:02}:00", (hour + 1) % 24))
}
