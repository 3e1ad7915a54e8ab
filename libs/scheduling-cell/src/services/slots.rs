// libs/scheduling-cell/src/services/slots.rs

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    DoctorScheduleConfig, PublishSlotRequest, PublishedSlot, SchedulingError, SetTimeOffRequest,
    SlotStatus, TimeOffWindow,
};
use crate::services::capacity::validate_slot_period;
use crate::services::clock::CivilClock;
use crate::store::ScheduleStore;

/// Doctor-facing schedule administration: publishing and cancelling
/// slots, setting the slot period, declaring time off.
pub struct SlotService {
    store: Arc<dyn ScheduleStore>,
    clock: CivilClock,
}

impl SlotService {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: CivilClock) -> Self {
        Self { store, clock }
    }

    /// Publish one bookable slot. Uniqueness of (doctor, day, time) is
    /// enforced by the store; a second publish surfaces as a conflict.
    pub async fn publish_slot(
        &self,
        doctor_id: Uuid,
        request: PublishSlotRequest,
        auth_token: &str,
    ) -> Result<PublishedSlot, SchedulingError> {
        let day = self.clock.parse_civil_day(&request.civil_day)?;
        let time = self.clock.parse_time_of_day(&request.time_of_day)?;

        if self.clock.is_past(day, time) {
            return Err(SchedulingError::PastBooking);
        }

        let slot = self
            .store
            .insert_published_slot(doctor_id, day, time, auth_token)
            .await?;

        info!(
            "Published slot {} for doctor {} at {} {}",
            slot.id, doctor_id, day, time
        );
        Ok(slot)
    }

    /// Cancel a published slot. Cancelling an already-cancelled slot is
    /// idempotent; a booked slot cannot be cancelled out from under its
    /// appointment.
    pub async fn cancel_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<PublishedSlot, SchedulingError> {
        let slot = self.store.published_slot(slot_id, auth_token).await?;

        match slot.status {
            SlotStatus::Cancelled => {
                debug!("Slot {} already cancelled", slot_id);
                Ok(slot)
            }
            SlotStatus::Booked => Err(SchedulingError::SlotConflict),
            SlotStatus::Available => {
                let updated = self
                    .store
                    .update_slot_status(slot_id, SlotStatus::Cancelled, auth_token)
                    .await?;
                info!("Cancelled slot {}", slot_id);
                Ok(updated)
            }
        }
    }

    pub async fn set_slot_period(
        &self,
        doctor_id: Uuid,
        slot_period_minutes: i32,
        auth_token: &str,
    ) -> Result<DoctorScheduleConfig, SchedulingError> {
        validate_slot_period(slot_period_minutes)?;

        let config = self
            .store
            .upsert_schedule_config(doctor_id, slot_period_minutes, auth_token)
            .await?;

        info!(
            "Set slot period for doctor {} to {} minutes",
            doctor_id, slot_period_minutes
        );
        Ok(config)
    }

    pub async fn set_time_off(
        &self,
        doctor_profile_id: Uuid,
        request: SetTimeOffRequest,
        auth_token: &str,
    ) -> Result<TimeOffWindow, SchedulingError> {
        if request.start_at >= request.end_at {
            return Err(SchedulingError::InvalidTemporalInput(
                "time off must start before it ends".to_string(),
            ));
        }

        let window = self
            .store
            .insert_time_off(
                doctor_profile_id,
                request.start_at,
                request.end_at,
                request.reason,
                auth_token,
            )
            .await?;

        info!(
            "Recorded time off {} for doctor profile {}",
            window.id, doctor_profile_id
        );
        Ok(window)
    }
}
