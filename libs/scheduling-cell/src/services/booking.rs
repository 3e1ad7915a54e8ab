// libs/scheduling-cell/src/services/booking.rs

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use notification_cell::{ChangeNotifier, EventKind, ScheduleEvent};

use crate::models::{
    Appointment, AppointmentStatus, BookAppointmentRequest, RescheduleAppointmentRequest,
    SchedulingError,
};
use crate::services::allocator::allocate;
use crate::services::capacity::DEFAULT_SLOT_PERIOD_MINUTES;
use crate::services::clock::CivilClock;
use crate::store::{AppointmentPatch, NewAppointment, ScheduleStore};

/// Orchestrates a booking end to end. Every read made here is advisory;
/// the store's commit-time uniqueness check is the authoritative
/// decision, and a commit conflict surfaces as `SlotConflict`.
pub struct BookingService {
    store: Arc<dyn ScheduleStore>,
    clock: CivilClock,
    notifier: ChangeNotifier,
}

impl BookingService {
    pub fn new(store: Arc<dyn ScheduleStore>, clock: CivilClock, notifier: ChangeNotifier) -> Self {
        Self {
            store,
            clock,
            notifier,
        }
    }

    /// Run the full booking sequence. Steps reject in a fixed order so a
    /// request failing several checks always reports the same error.
    pub async fn book_appointment(
        &self,
        request: BookAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        // 1. Required fields
        if request.civil_day.trim().is_empty() {
            return Err(SchedulingError::MissingField("civil_day".to_string()));
        }
        if request.requested_time.trim().is_empty() {
            return Err(SchedulingError::MissingField("requested_time".to_string()));
        }

        // 2. Temporal normalization
        let day = self.clock.parse_civil_day(&request.civil_day)?;
        let requested = self.clock.parse_time_of_day(&request.requested_time)?;

        debug!(
            "Booking request: patient {} with doctor {} on {} around {}",
            request.patient_id, request.doctor_id, day, requested
        );

        // 3. One appointment per patient/doctor/day
        let existing = self
            .store
            .patient_appointments_for_day(request.patient_id, request.doctor_id, day, auth_token)
            .await?;
        if !existing.is_empty() {
            return Err(SchedulingError::DuplicateDailyBooking);
        }

        // 4. Allocate a sub-slot within the requested hour
        let allocated = self
            .allocate_for_day(request.doctor_id, day, requested, None, auth_token)
            .await?;

        // 5. No booking in the past
        if self.clock.is_past(day, allocated) {
            return Err(SchedulingError::PastBooking);
        }

        // 6. Doctor time off
        self.check_blackout(request.doctor_id, day, allocated, auth_token)
            .await?;

        // 7. Published-slot gate: an explicit slot at the allocated time
        // pins the booking to it and must still be bookable.
        let slot_id = match self
            .store
            .published_slot_at(request.doctor_id, day, allocated, auth_token)
            .await?
        {
            Some(slot) if slot.status.is_bookable() => Some(slot.id),
            Some(slot) => {
                return Err(match slot.status {
                    crate::models::SlotStatus::Cancelled => SchedulingError::SlotCancelled,
                    _ => SchedulingError::SlotConflict,
                });
            }
            None => None,
        };

        // 8. Atomic commit: appointment insert and slot transition land
        // together or not at all.
        let appointment = self
            .store
            .commit_booking(
                NewAppointment {
                    patient_id: request.patient_id,
                    doctor_id: request.doctor_id,
                    civil_day: day,
                    time_of_day: allocated,
                    status: AppointmentStatus::Pending,
                    notes: request.notes,
                },
                slot_id,
                auth_token,
            )
            .await?;

        info!(
            "Booked appointment {} for patient {} at {} {}",
            appointment.id, appointment.patient_id, day, allocated
        );

        self.emit(EventKind::Booked, &appointment, auth_token).await;

        Ok(appointment)
    }

    /// Move an appointment in time and/or advance its status. A move
    /// re-runs allocation, past, blackout and conflict checks against
    /// the target day; the per-day duplicate rule applies at creation
    /// only.
    pub async fn reschedule_appointment(
        &self,
        appointment_id: Uuid,
        request: RescheduleAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, SchedulingError> {
        let current = self.store.appointment(appointment_id, auth_token).await?;

        if let Some(new_status) = request.new_status {
            if new_status != current.status
                && !current.status.valid_transitions().contains(&new_status)
            {
                return Err(SchedulingError::InvalidStatusTransition(current.status));
            }
        }

        let mut patch = AppointmentPatch {
            status: request.new_status,
            ..AppointmentPatch::default()
        };

        if request.moves_in_time() {
            let day = match &request.new_civil_day {
                Some(raw) => self.clock.parse_civil_day(raw)?,
                None => current.civil_day,
            };
            let requested = match &request.new_time {
                Some(raw) => self.clock.parse_time_of_day(raw)?,
                None => current.time_of_day,
            };

            // The appointment's own current slot never conflicts with
            // its new position.
            let exclude = (current.civil_day == day).then_some(current.time_of_day);
            let allocated = self
                .allocate_for_day(current.doctor_id, day, requested, exclude, auth_token)
                .await?;

            if self.clock.is_past(day, allocated) {
                return Err(SchedulingError::PastBooking);
            }

            self.check_blackout(current.doctor_id, day, allocated, auth_token)
                .await?;

            patch.civil_day = Some(day);
            patch.time_of_day = Some(allocated);
        }

        // Provisional signal ahead of the store write; subscribers
        // reconcile against the committed event that follows.
        let mut optimistic = current.clone();
        if let Some(day) = patch.civil_day {
            optimistic.civil_day = day;
        }
        if let Some(time) = patch.time_of_day {
            optimistic.time_of_day = time;
        }
        if let Some(status) = patch.status {
            optimistic.status = status;
        }
        self.emit(EventKind::UpdatedOptimistic, &optimistic, auth_token)
            .await;

        let updated = self
            .store
            .update_appointment(appointment_id, patch, auth_token)
            .await?;

        info!(
            "Rescheduled appointment {} to {} {} ({})",
            updated.id, updated.civil_day, updated.time_of_day, updated.status
        );

        self.emit(EventKind::Updated, &updated, auth_token).await;

        Ok(updated)
    }

    /// Load the day's conflict set and pick a sub-slot.
    async fn allocate_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        requested: NaiveTime,
        exclude: Option<NaiveTime>,
        auth_token: &str,
    ) -> Result<NaiveTime, SchedulingError> {
        let period = self
            .store
            .schedule_config(doctor_id, auth_token)
            .await?
            .map(|c| c.slot_period_minutes)
            .unwrap_or(DEFAULT_SLOT_PERIOD_MINUTES);

        let appointments = self
            .store
            .active_appointments_for_day(doctor_id, day, auth_token)
            .await?;
        let taken: Vec<NaiveTime> = appointments
            .iter()
            .filter(|a| a.occupies_slot())
            .map(|a| a.time_of_day)
            .filter(|t| Some(*t) != exclude)
            .collect();

        allocate(requested, &taken, period)
    }

    async fn check_blackout(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<(), SchedulingError> {
        let instant = self.clock.instant_of(day, time);
        let windows = self.store.time_off_windows(doctor_id, auth_token).await?;

        if windows.iter().any(|w| w.covers(instant)) {
            return Err(SchedulingError::BlackoutConflict);
        }
        Ok(())
    }

    /// Fan the event out; delivery failure never fails the booking.
    async fn emit(&self, kind: EventKind, appointment: &Appointment, auth_token: &str) {
        let hospital_ids = match self
            .store
            .hospitals_for_doctor(appointment.doctor_id, auth_token)
            .await
        {
            Ok(ids) => ids,
            Err(e) => {
                warn!("Could not resolve hospital scopes for event: {}", e);
                Vec::new()
            }
        };

        let event = ScheduleEvent {
            kind,
            appointment_id: appointment.id,
            doctor_id: appointment.doctor_id,
            patient_id: appointment.patient_id,
            hospital_ids,
            civil_day: appointment.civil_day,
            time_of_day: appointment.time_of_day,
            emitted_at: Utc::now(),
        };

        if let Err(e) = self.notifier.emit(event).await {
            warn!("Failed to emit {} event: {}", kind, e);
        }
    }
}
