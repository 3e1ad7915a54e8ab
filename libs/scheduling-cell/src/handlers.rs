// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use notification_cell::ChangeNotifier;
use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::{
    BookAppointmentRequest, PublishSlotRequest, RescheduleAppointmentRequest, SchedulingError,
    SetSlotPeriodRequest, SetTimeOffRequest,
};
use crate::services::{AvailabilityService, BookingService, CivilClock, SlotService};
use crate::store::{PostgrestScheduleStore, ScheduleStore};

impl From<SchedulingError> for AppError {
    fn from(err: SchedulingError) -> Self {
        match &err {
            SchedulingError::MissingField(_)
            | SchedulingError::InvalidTemporalInput(_)
            | SchedulingError::InvalidDate(_)
            | SchedulingError::InvalidSlotPeriod(_)
            | SchedulingError::PastBooking => AppError::BadRequest(err.to_string()),

            SchedulingError::DuplicateDailyBooking
            | SchedulingError::HourFullyBooked
            | SchedulingError::BlackoutConflict
            | SchedulingError::SlotConflict
            | SchedulingError::SlotCancelled
            | SchedulingError::InvalidStatusTransition(_) => AppError::Conflict(err.to_string()),

            SchedulingError::NotFound => AppError::NotFound(err.to_string()),

            SchedulingError::StoreUnavailable(_) => AppError::Database(err.to_string()),
        }
    }
}

fn store_for(config: &AppConfig) -> Arc<dyn ScheduleStore> {
    Arc::new(PostgrestScheduleStore::new(config))
}

// ==============================================================================
// QUERY PARAMETER STRUCTS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct DayQuery {
    pub date: String,
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

/// Hour-by-hour capacity report for one doctor's civil day.
pub async fn get_doctor_availability(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Availability request for doctor {} on {} from user: {}",
        doctor_id, query.date, user.id
    );

    let clock = CivilClock::from_config(&state);
    let day = clock.parse_civil_day(&query.date)?;

    let service = AvailabilityService::new(store_for(&state));
    let reports = service
        .get_availability(doctor_id, day, auth.token())
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "civil_day": day,
        "hours": reports,
    })))
}

/// Bookable published slot times plus the hour reports.
pub async fn get_doctor_slots(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Query(query): Query<DayQuery>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Slot listing request for doctor {} on {} from user: {}",
        doctor_id, query.date, user.id
    );

    let clock = CivilClock::from_config(&state);
    let day = clock.parse_civil_day(&query.date)?;

    let service = AvailabilityService::new(store_for(&state));
    let result = service
        .get_slots_and_availability(doctor_id, day, auth.token())
        .await?;

    Ok(Json(json!({
        "doctor_id": doctor_id,
        "civil_day": day,
        "published_slot_times": result.published_slot_times,
        "hours": result.reports,
    })))
}

// ==============================================================================
// BOOKING HANDLERS
// ==============================================================================

pub async fn book_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Booking request for patient {} with doctor {} from user: {}",
        request.patient_id, request.doctor_id, user.id
    );

    let clock = CivilClock::from_config(&state);
    let service = BookingService::new(store_for(&state), clock, notifier);
    let appointment = service.book_appointment(request, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

pub async fn reschedule_appointment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<RescheduleAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Reschedule request for appointment {} from user: {}",
        appointment_id, user.id
    );

    let clock = CivilClock::from_config(&state);
    let service = BookingService::new(store_for(&state), clock, notifier);
    let appointment = service
        .reschedule_appointment(appointment_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "appointment": appointment,
    })))
}

// ==============================================================================
// SLOT ADMINISTRATION HANDLERS
// ==============================================================================

pub async fn publish_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<PublishSlotRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Slot publish request for doctor {} from user: {}",
        doctor_id, user.id
    );

    let clock = CivilClock::from_config(&state);
    let service = SlotService::new(store_for(&state), clock);
    let slot = service
        .publish_slot(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
    })))
}

pub async fn cancel_slot(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(slot_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    info!("Slot cancel request for {} from user: {}", slot_id, user.id);

    let clock = CivilClock::from_config(&state);
    let service = SlotService::new(store_for(&state), clock);
    let slot = service.cancel_slot(slot_id, auth.token()).await?;

    Ok(Json(json!({
        "success": true,
        "slot": slot,
    })))
}

pub async fn set_slot_period(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SetSlotPeriodRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Slot period update for doctor {} to {} minutes from user: {}",
        doctor_id, request.slot_period_minutes, user.id
    );

    let clock = CivilClock::from_config(&state);
    let service = SlotService::new(store_for(&state), clock);
    let config = service
        .set_slot_period(doctor_id, request.slot_period_minutes, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "config": config,
    })))
}

pub async fn set_time_off(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<SetTimeOffRequest>,
) -> Result<Json<Value>, AppError> {
    info!(
        "Time off request for doctor {} from user: {}",
        doctor_id, user.id
    );

    let clock = CivilClock::from_config(&state);
    let service = SlotService::new(store_for(&state), clock);
    let window = service
        .set_time_off(doctor_id, request, auth.token())
        .await?;

    Ok(Json(json!({
        "success": true,
        "time_off": window,
    })))
}
