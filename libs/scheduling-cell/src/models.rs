// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub civil_day: NaiveDate,
    pub time_of_day: NaiveTime,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// Whether this appointment occupies its doctor-time slot.
    pub fn occupies_slot(&self) -> bool {
        self.status != AppointmentStatus::Cancelled
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl AppointmentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Cancelled | AppointmentStatus::Completed)
    }

    /// Allowed next statuses. Cancellation is reachable from any
    /// non-terminal state; completed and cancelled are terminal.
    pub fn valid_transitions(&self) -> Vec<AppointmentStatus> {
        match self {
            AppointmentStatus::Pending => vec![
                AppointmentStatus::Confirmed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Confirmed => vec![
                AppointmentStatus::Completed,
                AppointmentStatus::Cancelled,
            ],
            AppointmentStatus::Cancelled => vec![],
            AppointmentStatus::Completed => vec![],
        }
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::Completed => write!(f, "completed"),
        }
    }
}

/// A doctor's explicit declaration that one sub-slot is open for booking.
/// Unique per (doctor, day, time); absence of a slot means the allocator
/// falls back to pure capacity checking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishedSlot {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub civil_day: NaiveDate,
    pub time_of_day: NaiveTime,
    pub status: SlotStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Available,
    Booked,
    Cancelled,
}

impl SlotStatus {
    /// BOOKED and CANCELLED are terminal for booking purposes; there is
    /// no second transition into BOOKED.
    pub fn is_bookable(&self) -> bool {
        matches!(self, SlotStatus::Available)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotStatus::Available => write!(f, "available"),
            SlotStatus::Booked => write!(f, "booked"),
            SlotStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorScheduleConfig {
    pub doctor_id: Uuid,
    pub slot_period_minutes: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeOffWindow {
    pub id: Uuid,
    pub doctor_profile_id: Uuid,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TimeOffWindow {
    /// Blackout coverage is inclusive on both ends.
    pub fn covers(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.start_at && instant <= self.end_at
    }
}

/// Derived, never persisted: bookings vs. capacity for one hour of one
/// doctor's day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HourCapacityReport {
    pub hour: u32,
    pub capacity: i32,
    pub booked_count: i32,
    pub is_full: bool,
    pub label_from: String,
    pub label_to: String,
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub civil_day: String,
    pub requested_time: String,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RescheduleAppointmentRequest {
    pub new_civil_day: Option<String>,
    pub new_time: Option<String>,
    pub new_status: Option<AppointmentStatus>,
}

impl RescheduleAppointmentRequest {
    pub fn moves_in_time(&self) -> bool {
        self.new_civil_day.is_some() || self.new_time.is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishSlotRequest {
    pub civil_day: String,
    pub time_of_day: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetSlotPeriodRequest {
    pub slot_period_minutes: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetTimeOffRequest {
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotsAndAvailability {
    pub published_slot_times: Vec<NaiveTime>,
    pub reports: Vec<HourCapacityReport>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

/// Every variant except `StoreUnavailable` is an expected, user-facing
/// outcome of contention or bad input; none warrants an automatic retry.
#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error, PartialEq, Eq)]
pub enum SchedulingError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid date or time input: {0}")]
    InvalidTemporalInput(String),

    #[error("Invalid civil day: {0}")]
    InvalidDate(String),

    #[error("Requested slot is in the past")]
    PastBooking,

    #[error("Patient already has an appointment with this doctor that day")]
    DuplicateDailyBooking,

    #[error("No free sub-slot left in the requested hour")]
    HourFullyBooked,

    #[error("Requested time falls within the doctor's time off")]
    BlackoutConflict,

    #[error("Slot already taken")]
    SlotConflict,

    #[error("Slot has been cancelled")]
    SlotCancelled,

    #[error("Slot period must be one of 10, 15, 20, 30 or 60 minutes, got {0}")]
    InvalidSlotPeriod(i32),

    #[error("Status transition from {0} is not allowed")]
    InvalidStatusTransition(AppointmentStatus),

    #[error("Record not found")]
    NotFound,

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}
