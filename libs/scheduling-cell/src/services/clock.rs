// libs/scheduling-cell/src/services/clock.rs
//
// All civil dates and times in the engine are interpreted against a
// single fixed UTC offset. There is no per-user timezone; "today" and
// "in the past" mean the same thing for every caller.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

use shared_config::AppConfig;

use crate::models::SchedulingError;

#[derive(Debug, Clone, Copy)]
pub struct CivilClock {
    offset: FixedOffset,
}

impl CivilClock {
    pub fn new(offset_minutes: i32) -> Self {
        // Falls back to UTC only on an out-of-range offset, which
        // from_env already guards against.
        let offset = FixedOffset::east_opt(offset_minutes * 60)
            .unwrap_or_else(|| FixedOffset::east_opt(0).unwrap());
        Self { offset }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.civil_utc_offset_minutes)
    }

    /// Parse a `YYYY-MM-DD` civil day.
    pub fn parse_civil_day(&self, raw: &str) -> Result<NaiveDate, SchedulingError> {
        NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map_err(|_| SchedulingError::InvalidDate(raw.to_string()))
    }

    /// Parse a time of day, accepting `HH:MM` or `HH:MM:SS`.
    pub fn parse_time_of_day(&self, raw: &str) -> Result<NaiveTime, SchedulingError> {
        let trimmed = raw.trim();
        NaiveTime::parse_from_str(trimmed, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M:%S"))
            .map_err(|_| SchedulingError::InvalidTemporalInput(raw.to_string()))
    }

    /// The UTC instant at which `time` occurs on `day`.
    pub fn instant_of(&self, day: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        // A fixed offset has no gaps or folds, so this mapping is total.
        match self.offset.from_local_datetime(&day.and_time(time)) {
            chrono::LocalResult::Single(dt) => dt.with_timezone(&Utc),
            // Unreachable for FixedOffset; keep a deterministic fallback.
            _ => Utc.from_utc_datetime(&day.and_time(time)),
        }
    }

    /// The current civil day under the engine offset.
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.offset).date_naive()
    }

    /// True unless the instant is strictly in the future.
    pub fn is_past(&self, day: NaiveDate, time: NaiveTime) -> bool {
        self.instant_of(day, time) <= Utc::now()
    }
}
