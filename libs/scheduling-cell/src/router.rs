use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post, put},
    Extension, Router,
};

use notification_cell::ChangeNotifier;
use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    book_appointment, cancel_slot, get_doctor_availability, get_doctor_slots, publish_slot,
    reschedule_appointment, set_slot_period, set_time_off,
};

pub fn create_scheduling_router(state: Arc<AppConfig>, notifier: ChangeNotifier) -> Router {
    let protected_routes = Router::new()
        .route("/doctors/{doctor_id}/availability", get(get_doctor_availability))
        .route("/doctors/{doctor_id}/slots", get(get_doctor_slots).post(publish_slot))
        .route("/doctors/{doctor_id}/slot-period", put(set_slot_period))
        .route("/doctors/{doctor_id}/time-off", post(set_time_off))
        .route("/appointments", post(book_appointment))
        .route("/appointments/{appointment_id}", axum::routing::patch(reschedule_appointment))
        .route("/slots/{slot_id}/cancel", post(cancel_slot))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .layer(Extension(notifier))
        .with_state(state)
}
