// libs/scheduling-cell/src/services/availability.rs

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{NaiveDate, Timelike};
use tracing::debug;
use uuid::Uuid;

use crate::models::{HourCapacityReport, SchedulingError, SlotsAndAvailability};
use crate::services::capacity::{
    capacity_per_hour, hour_labels, sub_slot_times, DEFAULT_SLOT_PERIOD_MINUTES,
    DEFAULT_WORKING_HOURS,
};
use crate::store::ScheduleStore;

/// Read-only, point-in-time capacity reporting. Takes no locks and
/// writes nothing; re-reading without intervening writes yields the
/// identical report.
pub struct AvailabilityService {
    store: Arc<dyn ScheduleStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn ScheduleStore>) -> Self {
        Self { store }
    }

    /// Hour-by-hour capacity report for one doctor's civil day.
    ///
    /// Reporting hours come from the doctor's bookable published slots;
    /// a doctor with none published is reported over the default
    /// working window.
    pub async fn get_availability(
        &self,
        doctor_id: Uuid,
        civil_day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<HourCapacityReport>, SchedulingError> {
        debug!(
            "Computing availability for doctor {} on {}",
            doctor_id, civil_day
        );

        let period = self.slot_period(doctor_id, auth_token).await?;

        let appointments = self
            .store
            .active_appointments_for_day(doctor_id, civil_day, auth_token)
            .await?;
        let booked_times: Vec<_> = appointments
            .iter()
            .filter(|a| a.occupies_slot())
            .map(|a| a.time_of_day)
            .collect();

        let slots = self
            .store
            .published_slots_for_day(doctor_id, civil_day, auth_token)
            .await?;

        // BTreeSet keeps the reporting hours ordered and distinct.
        let hours: BTreeSet<u32> = {
            let published: BTreeSet<u32> = slots
                .iter()
                .filter(|s| s.status.is_bookable())
                .map(|s| s.time_of_day.hour())
                .collect();
            if published.is_empty() {
                DEFAULT_WORKING_HOURS.collect()
            } else {
                published
            }
        };

        let capacity = capacity_per_hour(period);
        let reports = hours
            .into_iter()
            .map(|hour| {
                // Only occupancy on the hour's sub-slot boundaries counts;
                // an appointment stranded off-boundary by a period change
                // does not consume a sub-slot.
                let booked_count = sub_slot_times(hour, period)
                    .into_iter()
                    .filter(|t| booked_times.contains(t))
                    .count() as i32;
                let (label_from, label_to) = hour_labels(hour);
                HourCapacityReport {
                    hour,
                    capacity,
                    booked_count,
                    is_full: booked_count >= capacity,
                    label_from,
                    label_to,
                }
            })
            .collect();

        Ok(reports)
    }

    /// Bookable published slot times alongside the hour reports.
    pub async fn get_slots_and_availability(
        &self,
        doctor_id: Uuid,
        civil_day: NaiveDate,
        auth_token: &str,
    ) -> Result<SlotsAndAvailability, SchedulingError> {
        let slots = self
            .store
            .published_slots_for_day(doctor_id, civil_day, auth_token)
            .await?;

        let published_slot_times = slots
            .iter()
            .filter(|s| s.status.is_bookable())
            .map(|s| s.time_of_day)
            .collect();

        let reports = self
            .get_availability(doctor_id, civil_day, auth_token)
            .await?;

        Ok(SlotsAndAvailability {
            published_slot_times,
            reports,
        })
    }

    async fn slot_period(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<i32, SchedulingError> {
        let period = self
            .store
            .schedule_config(doctor_id, auth_token)
            .await?
            .map(|c| c.slot_period_minutes)
            .unwrap_or(DEFAULT_SLOT_PERIOD_MINUTES);
        Ok(period)
    }
}
