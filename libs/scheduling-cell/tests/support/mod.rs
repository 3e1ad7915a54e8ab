// Shared fixtures for the scheduling integration tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use uuid::Uuid;

use scheduling_cell::models::{
    Appointment, AppointmentStatus, DoctorScheduleConfig, PublishedSlot, SlotStatus, TimeOffWindow,
};
use scheduling_cell::store::{AppointmentPatch, NewAppointment, ScheduleStore, StoreError};

pub const TEST_TOKEN: &str = "test-token";

#[derive(Default)]
struct Inner {
    appointments: Vec<Appointment>,
    slots: Vec<PublishedSlot>,
    configs: HashMap<Uuid, DoctorScheduleConfig>,
    time_off: Vec<TimeOffWindow>,
    hospitals: HashMap<Uuid, Vec<Uuid>>,
    fail_next_commit: bool,
    conflict_next_commit: bool,
}

/// Deterministic in-process stand-in for the relational store. Enforces
/// the same uniqueness and atomicity guarantees the contract demands,
/// and can inject a commit failure or a losing-race conflict.
#[derive(Default)]
pub struct InMemoryScheduleStore {
    inner: Mutex<Inner>,
}

impl InMemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_config(&self, doctor_id: Uuid, slot_period_minutes: i32) {
        let mut inner = self.inner.lock().unwrap();
        inner.configs.insert(
            doctor_id,
            DoctorScheduleConfig {
                doctor_id,
                slot_period_minutes,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn seed_slot(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        status: SlotStatus,
    ) -> Uuid {
        let slot = PublishedSlot {
            id: Uuid::new_v4(),
            doctor_id,
            civil_day: day,
            time_of_day: time,
            status,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = slot.id;
        self.inner.lock().unwrap().slots.push(slot);
        id
    }

    pub fn seed_appointment(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        status: AppointmentStatus,
    ) -> Uuid {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            civil_day: day,
            time_of_day: time,
            status,
            notes: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let id = appointment.id;
        self.inner.lock().unwrap().appointments.push(appointment);
        id
    }

    pub fn seed_time_off(
        &self,
        doctor_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
    ) {
        self.inner.lock().unwrap().time_off.push(TimeOffWindow {
            id: Uuid::new_v4(),
            doctor_profile_id: doctor_id,
            start_at,
            end_at,
            reason: None,
            created_at: Utc::now(),
        });
    }

    pub fn seed_hospitals(&self, doctor_id: Uuid, hospital_ids: Vec<Uuid>) {
        self.inner.lock().unwrap().hospitals.insert(doctor_id, hospital_ids);
    }

    /// The next commit fails as an infrastructure fault, after the
    /// advisory checks have passed.
    pub fn fail_next_commit(&self) {
        self.inner.lock().unwrap().fail_next_commit = true;
    }

    /// The next commit loses the race: the store reports a unique
    /// violation as if a concurrent writer landed first.
    pub fn conflict_next_commit(&self) {
        self.inner.lock().unwrap().conflict_next_commit = true;
    }

    pub fn appointment_count(&self) -> usize {
        self.inner.lock().unwrap().appointments.len()
    }

    pub fn slot_status(&self, slot_id: Uuid) -> Option<SlotStatus> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .iter()
            .find(|s| s.id == slot_id)
            .map(|s| s.status)
    }
}

#[async_trait]
impl ScheduleStore for InMemoryScheduleStore {
    async fn schedule_config(
        &self,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<Option<DoctorScheduleConfig>, StoreError> {
        Ok(self.inner.lock().unwrap().configs.get(&doctor_id).cloned())
    }

    async fn upsert_schedule_config(
        &self,
        doctor_id: Uuid,
        slot_period_minutes: i32,
        _auth_token: &str,
    ) -> Result<DoctorScheduleConfig, StoreError> {
        let config = DoctorScheduleConfig {
            doctor_id,
            slot_period_minutes,
            updated_at: Utc::now(),
        };
        self.inner
            .lock()
            .unwrap()
            .configs
            .insert(doctor_id, config.clone());
        Ok(config)
    }

    async fn active_appointments_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        let mut rows: Vec<Appointment> = self
            .inner
            .lock()
            .unwrap()
            .appointments
            .iter()
            .filter(|a| a.doctor_id == doctor_id && a.civil_day == day && a.occupies_slot())
            .cloned()
            .collect();
        rows.sort_by_key(|a| a.time_of_day);
        Ok(rows)
    }

    async fn patient_appointments_for_day(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        day: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .appointments
            .iter()
            .filter(|a| {
                a.patient_id == patient_id
                    && a.doctor_id == doctor_id
                    && a.civil_day == day
                    && a.occupies_slot()
            })
            .cloned()
            .collect())
    }

    async fn appointment(&self, id: Uuid, _auth_token: &str) -> Result<Appointment, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .appointments
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn published_slots_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        _auth_token: &str,
    ) -> Result<Vec<PublishedSlot>, StoreError> {
        let mut rows: Vec<PublishedSlot> = self
            .inner
            .lock()
            .unwrap()
            .slots
            .iter()
            .filter(|s| s.doctor_id == doctor_id && s.civil_day == day)
            .cloned()
            .collect();
        rows.sort_by_key(|s| s.time_of_day);
        Ok(rows)
    }

    async fn published_slot_at(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        _auth_token: &str,
    ) -> Result<Option<PublishedSlot>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .slots
            .iter()
            .find(|s| s.doctor_id == doctor_id && s.civil_day == day && s.time_of_day == time)
            .cloned())
    }

    async fn published_slot(
        &self,
        slot_id: Uuid,
        _auth_token: &str,
    ) -> Result<PublishedSlot, StoreError> {
        self.inner
            .lock()
            .unwrap()
            .slots
            .iter()
            .find(|s| s.id == slot_id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn insert_published_slot(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        _auth_token: &str,
    ) -> Result<PublishedSlot, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        if inner
            .slots
            .iter()
            .any(|s| s.doctor_id == doctor_id && s.civil_day == day && s.time_of_day == time)
        {
            return Err(StoreError::Conflict);
        }

        let slot = PublishedSlot {
            id: Uuid::new_v4(),
            doctor_id,
            civil_day: day,
            time_of_day: time,
            status: SlotStatus::Available,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.slots.push(slot.clone());
        Ok(slot)
    }

    async fn update_slot_status(
        &self,
        slot_id: Uuid,
        status: SlotStatus,
        _auth_token: &str,
    ) -> Result<PublishedSlot, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let slot = inner
            .slots
            .iter_mut()
            .find(|s| s.id == slot_id)
            .ok_or(StoreError::NotFound)?;
        slot.status = status;
        slot.updated_at = Utc::now();
        Ok(slot.clone())
    }

    async fn commit_booking(
        &self,
        appointment: NewAppointment,
        slot_id: Option<Uuid>,
        _auth_token: &str,
    ) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.lock().unwrap();

        if inner.fail_next_commit {
            inner.fail_next_commit = false;
            return Err(StoreError::Unavailable("injected commit failure".to_string()));
        }
        if inner.conflict_next_commit {
            inner.conflict_next_commit = false;
            return Err(StoreError::Conflict);
        }

        // Unique (doctor, day, time) among occupying appointments.
        if inner.appointments.iter().any(|a| {
            a.doctor_id == appointment.doctor_id
                && a.civil_day == appointment.civil_day
                && a.time_of_day == appointment.time_of_day
                && a.occupies_slot()
        }) {
            return Err(StoreError::Conflict);
        }

        // Slot transition and insert land together or not at all.
        if let Some(slot_id) = slot_id {
            let slot = inner
                .slots
                .iter_mut()
                .find(|s| s.id == slot_id)
                .ok_or(StoreError::NotFound)?;
            if slot.status != SlotStatus::Available {
                return Err(StoreError::Conflict);
            }
            slot.status = SlotStatus::Booked;
            slot.updated_at = Utc::now();
        }

        let row = Appointment {
            id: Uuid::new_v4(),
            patient_id: appointment.patient_id,
            doctor_id: appointment.doctor_id,
            civil_day: appointment.civil_day,
            time_of_day: appointment.time_of_day,
            status: appointment.status,
            notes: appointment.notes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        inner.appointments.push(row.clone());
        Ok(row)
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        _auth_token: &str,
    ) -> Result<Appointment, StoreError> {
        let mut inner = self.inner.lock().unwrap();
        let appointment = inner
            .appointments
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(StoreError::NotFound)?;

        if let Some(day) = patch.civil_day {
            appointment.civil_day = day;
        }
        if let Some(time) = patch.time_of_day {
            appointment.time_of_day = time;
        }
        if let Some(status) = patch.status {
            appointment.status = status;
        }
        appointment.updated_at = Utc::now();
        Ok(appointment.clone())
    }

    async fn time_off_windows(
        &self,
        doctor_profile_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<TimeOffWindow>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .time_off
            .iter()
            .filter(|w| w.doctor_profile_id == doctor_profile_id)
            .cloned()
            .collect())
    }

    async fn insert_time_off(
        &self,
        doctor_profile_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        reason: Option<String>,
        _auth_token: &str,
    ) -> Result<TimeOffWindow, StoreError> {
        let window = TimeOffWindow {
            id: Uuid::new_v4(),
            doctor_profile_id,
            start_at,
            end_at,
            reason,
            created_at: Utc::now(),
        };
        self.inner.lock().unwrap().time_off.push(window.clone());
        Ok(window)
    }

    async fn hospitals_for_doctor(
        &self,
        doctor_id: Uuid,
        _auth_token: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .hospitals
            .get(&doctor_id)
            .cloned()
            .unwrap_or_default())
    }
}
