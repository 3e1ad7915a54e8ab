// libs/scheduling-cell/src/store.rs
//
// Persistence contract for the scheduling engine. The relational store is
// the single source of truth for the final accept/reject decision: every
// read performed for a booking decision is advisory, and the authoritative
// conflict check happens inside `commit_booking`, in the same atomic unit
// as the write.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::{DbError, SupabaseClient};

use crate::models::{
    Appointment, AppointmentStatus, DoctorScheduleConfig, PublishedSlot, SchedulingError,
    SlotStatus, TimeOffWindow,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint (or equivalent single-writer-wins primitive)
    /// rejected the write: another writer got there first.
    #[error("conflicting write")]
    Conflict,

    #[error("row not found")]
    NotFound,

    /// Infrastructure fault, never to be folded into a business rejection.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Conflict(_) => StoreError::Conflict,
            DbError::NotFound(_) => StoreError::NotFound,
            other => StoreError::Unavailable(other.to_string()),
        }
    }
}

impl From<StoreError> for SchedulingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict => SchedulingError::SlotConflict,
            StoreError::NotFound => SchedulingError::NotFound,
            StoreError::Unavailable(msg) => SchedulingError::StoreUnavailable(msg),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub civil_day: NaiveDate,
    pub time_of_day: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentPatch {
    pub civil_day: Option<NaiveDate>,
    pub time_of_day: Option<NaiveTime>,
    pub status: Option<AppointmentStatus>,
}

/// Contract the engine requires from the persisted store:
///
/// * per-row serializable update semantics;
/// * two concurrent inserts of the same `(doctor, day, time)` appointment
///   cannot both succeed — the loser observes `StoreError::Conflict`;
/// * `commit_booking` applies the appointment insert and the published
///   slot's `available -> booked` transition as one atomic unit, or not
///   at all;
/// * no caching across requests — every call reads fresh state.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn schedule_config(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorScheduleConfig>, StoreError>;

    async fn upsert_schedule_config(
        &self,
        doctor_id: Uuid,
        slot_period_minutes: i32,
        auth_token: &str,
    ) -> Result<DoctorScheduleConfig, StoreError>;

    /// All non-cancelled appointments of the doctor on the given day.
    async fn active_appointments_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, StoreError>;

    /// All non-cancelled appointments the patient holds with the doctor
    /// on the given day.
    async fn patient_appointments_for_day(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, StoreError>;

    async fn appointment(&self, id: Uuid, auth_token: &str) -> Result<Appointment, StoreError>;

    async fn published_slots_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<PublishedSlot>, StoreError>;

    async fn published_slot_at(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Option<PublishedSlot>, StoreError>;

    async fn published_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<PublishedSlot, StoreError>;

    async fn insert_published_slot(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<PublishedSlot, StoreError>;

    async fn update_slot_status(
        &self,
        slot_id: Uuid,
        status: SlotStatus,
        auth_token: &str,
    ) -> Result<PublishedSlot, StoreError>;

    /// Create the appointment and, when `slot_id` is given, transition
    /// that slot to `booked` in the same atomic unit.
    async fn commit_booking(
        &self,
        appointment: NewAppointment,
        slot_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Appointment, StoreError>;

    async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        auth_token: &str,
    ) -> Result<Appointment, StoreError>;

    async fn time_off_windows(
        &self,
        doctor_profile_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TimeOffWindow>, StoreError>;

    async fn insert_time_off(
        &self,
        doctor_profile_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<TimeOffWindow, StoreError>;

    /// Hospital memberships of the doctor, used for notification scoping.
    async fn hospitals_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Uuid>, StoreError>;
}

// ==============================================================================
// POSTGREST-BACKED IMPLEMENTATION
// ==============================================================================

pub struct PostgrestScheduleStore {
    supabase: SupabaseClient,
}

impl PostgrestScheduleStore {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, StoreError> {
        rows.into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<T>, _>>()
            .map_err(|e| StoreError::Unavailable(format!("failed to parse store rows: {}", e)))
    }

    fn single_row<T: serde::de::DeserializeOwned>(mut rows: Vec<Value>) -> Result<T, StoreError> {
        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }
        serde_json::from_value(rows.remove(0))
            .map_err(|e| StoreError::Unavailable(format!("failed to parse store row: {}", e)))
    }

    fn representation_headers() -> reqwest::header::HeaderMap {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static("return=representation"),
        );
        headers
    }
}

#[async_trait]
impl ScheduleStore for PostgrestScheduleStore {
    async fn schedule_config(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<DoctorScheduleConfig>, StoreError> {
        let path = format!("/rest/v1/doctor_schedule_configs?doctor_id=eq.{}", doctor_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(Self::parse_rows::<DoctorScheduleConfig>(rows)?.into_iter().next())
    }

    async fn upsert_schedule_config(
        &self,
        doctor_id: Uuid,
        slot_period_minutes: i32,
        auth_token: &str,
    ) -> Result<DoctorScheduleConfig, StoreError> {
        let body = json!({
            "doctor_id": doctor_id,
            "slot_period_minutes": slot_period_minutes,
            "updated_at": Utc::now().to_rfc3339(),
        });

        let mut headers = Self::representation_headers();
        headers.insert(
            "Prefer",
            reqwest::header::HeaderValue::from_static(
                "return=representation,resolution=merge-duplicates",
            ),
        );

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/doctor_schedule_configs",
                Some(auth_token),
                Some(body),
                Some(headers),
            )
            .await?;

        Self::single_row(rows)
    }

    async fn active_appointments_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?doctor_id=eq.{}&civil_day=eq.{}&status=neq.cancelled&order=time_of_day.asc",
            doctor_id, day
        );
        debug!("Loading active appointments: {}", path);

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Self::parse_rows(rows)
    }

    async fn patient_appointments_for_day(
        &self,
        patient_id: Uuid,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>, StoreError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&doctor_id=eq.{}&civil_day=eq.{}&status=neq.cancelled",
            patient_id, doctor_id, day
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Self::parse_rows(rows)
    }

    async fn appointment(&self, id: Uuid, auth_token: &str) -> Result<Appointment, StoreError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Self::single_row(rows)
    }

    async fn published_slots_for_day(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<PublishedSlot>, StoreError> {
        let path = format!(
            "/rest/v1/published_slots?doctor_id=eq.{}&civil_day=eq.{}&order=time_of_day.asc",
            doctor_id, day
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Self::parse_rows(rows)
    }

    async fn published_slot_at(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<Option<PublishedSlot>, StoreError> {
        let encoded_time = urlencoding::encode(&time.format("%H:%M:%S").to_string()).into_owned();
        let path = format!(
            "/rest/v1/published_slots?doctor_id=eq.{}&civil_day=eq.{}&time_of_day=eq.{}",
            doctor_id, day, encoded_time
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(Self::parse_rows::<PublishedSlot>(rows)?.into_iter().next())
    }

    async fn published_slot(
        &self,
        slot_id: Uuid,
        auth_token: &str,
    ) -> Result<PublishedSlot, StoreError> {
        let path = format!("/rest/v1/published_slots?id=eq.{}", slot_id);
        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Self::single_row(rows)
    }

    async fn insert_published_slot(
        &self,
        doctor_id: Uuid,
        day: NaiveDate,
        time: NaiveTime,
        auth_token: &str,
    ) -> Result<PublishedSlot, StoreError> {
        let now = Utc::now();
        let body = json!({
            "doctor_id": doctor_id,
            "civil_day": day.to_string(),
            "time_of_day": time.format("%H:%M:%S").to_string(),
            "status": SlotStatus::Available.to_string(),
            "created_at": now.to_rfc3339(),
            "updated_at": now.to_rfc3339(),
        });

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/published_slots",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await?;

        Self::single_row(rows)
    }

    async fn update_slot_status(
        &self,
        slot_id: Uuid,
        status: SlotStatus,
        auth_token: &str,
    ) -> Result<PublishedSlot, StoreError> {
        let path = format!("/rest/v1/published_slots?id=eq.{}", slot_id);
        let body = json!({
            "status": status.to_string(),
            "updated_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await?;

        Self::single_row(rows)
    }

    async fn commit_booking(
        &self,
        appointment: NewAppointment,
        slot_id: Option<Uuid>,
        auth_token: &str,
    ) -> Result<Appointment, StoreError> {
        // The store-side function inserts the appointment and flips the
        // slot in one transaction; a unique violation on either write
        // rolls back both and surfaces as a conflict.
        let args = json!({
            "p_patient_id": appointment.patient_id,
            "p_doctor_id": appointment.doctor_id,
            "p_civil_day": appointment.civil_day.to_string(),
            "p_time_of_day": appointment.time_of_day.format("%H:%M:%S").to_string(),
            "p_status": appointment.status.to_string(),
            "p_notes": appointment.notes,
            "p_slot_id": slot_id,
        });

        let row: Value = self
            .supabase
            .rpc("book_appointment_tx", Some(auth_token), args)
            .await?;

        serde_json::from_value(row)
            .map_err(|e| StoreError::Unavailable(format!("failed to parse booked appointment: {}", e)))
    }

    async fn update_appointment(
        &self,
        id: Uuid,
        patch: AppointmentPatch,
        auth_token: &str,
    ) -> Result<Appointment, StoreError> {
        let mut body = serde_json::Map::new();
        if let Some(day) = patch.civil_day {
            body.insert("civil_day".to_string(), json!(day.to_string()));
        }
        if let Some(time) = patch.time_of_day {
            body.insert(
                "time_of_day".to_string(),
                json!(time.format("%H:%M:%S").to_string()),
            );
        }
        if let Some(status) = patch.status {
            body.insert("status".to_string(), json!(status.to_string()));
        }
        body.insert("updated_at".to_string(), json!(Utc::now().to_rfc3339()));

        let path = format!("/rest/v1/appointments?id=eq.{}", id);
        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::PATCH,
                &path,
                Some(auth_token),
                Some(Value::Object(body)),
                Some(Self::representation_headers()),
            )
            .await?;

        Self::single_row(rows)
    }

    async fn time_off_windows(
        &self,
        doctor_profile_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<TimeOffWindow>, StoreError> {
        let path = format!(
            "/rest/v1/time_off_windows?doctor_profile_id=eq.{}&order=start_at.asc",
            doctor_profile_id
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Self::parse_rows(rows)
    }

    async fn insert_time_off(
        &self,
        doctor_profile_id: Uuid,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        reason: Option<String>,
        auth_token: &str,
    ) -> Result<TimeOffWindow, StoreError> {
        let body = json!({
            "doctor_profile_id": doctor_profile_id,
            "start_at": start_at.to_rfc3339(),
            "end_at": end_at.to_rfc3339(),
            "reason": reason,
            "created_at": Utc::now().to_rfc3339(),
        });

        let rows: Vec<Value> = self
            .supabase
            .request_with_headers(
                Method::POST,
                "/rest/v1/time_off_windows",
                Some(auth_token),
                Some(body),
                Some(Self::representation_headers()),
            )
            .await?;

        Self::single_row(rows)
    }

    async fn hospitals_for_doctor(
        &self,
        doctor_id: Uuid,
        auth_token: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        #[derive(Deserialize)]
        struct Membership {
            hospital_id: Uuid,
        }

        let path = format!(
            "/rest/v1/hospital_memberships?doctor_id=eq.{}&select=hospital_id",
            doctor_id
        );

        let rows: Vec<Value> = self
            .supabase
            .request(Method::GET, &path, Some(auth_token), None)
            .await?;

        Ok(Self::parse_rows::<Membership>(rows)?
            .into_iter()
            .map(|m| m.hospital_id)
            .collect())
    }
}
