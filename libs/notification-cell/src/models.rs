use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// What happened to an appointment. `UpdatedOptimistic` is the
/// pre-commit signal sent before the store write lands; subscribers
/// treat it as provisional and reconcile against the follow-up event.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    Booked,
    Updated,
    UpdatedOptimistic,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Booked => write!(f, "booked"),
            EventKind::Updated => write!(f, "updated"),
            EventKind::UpdatedOptimistic => write!(f, "updated-optimistic"),
        }
    }
}

/// One audience a subscriber can listen on. Hospital scope reaches
/// everyone following a facility; doctor and patient scopes are
/// per-identity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "scope", content = "id", rename_all = "snake_case")]
pub enum SubscriberScope {
    Hospital(Uuid),
    Doctor(Uuid),
    Patient(Uuid),
}

impl fmt::Display for SubscriberScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubscriberScope::Hospital(id) => write!(f, "hospital:{}", id),
            SubscriberScope::Doctor(id) => write!(f, "doctor:{}", id),
            SubscriberScope::Patient(id) => write!(f, "patient:{}", id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleEvent {
    pub kind: EventKind,
    pub appointment_id: Uuid,
    pub doctor_id: Uuid,
    pub patient_id: Uuid,
    /// Facilities the doctor belongs to at emit time.
    pub hospital_ids: Vec<Uuid>,
    pub civil_day: NaiveDate,
    pub time_of_day: NaiveTime,
    pub emitted_at: DateTime<Utc>,
}

impl ScheduleEvent {
    /// Audiences this event fans out to.
    pub fn scopes(&self) -> Vec<SubscriberScope> {
        let mut scopes = vec![
            SubscriberScope::Doctor(self.doctor_id),
            SubscriberScope::Patient(self.patient_id),
        ];
        scopes.extend(self.hospital_ids.iter().map(|id| SubscriberScope::Hospital(*id)));
        scopes
    }
}
