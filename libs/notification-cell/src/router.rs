use std::sync::Arc;

use axum::{middleware, routing::get, Extension, Router};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{
    get_active_subscriptions, subscribe_all, subscribe_doctor, subscribe_hospital,
    subscribe_patient,
};
use crate::services::notifier::ChangeNotifier;

pub fn create_notification_router(state: Arc<AppConfig>, notifier: ChangeNotifier) -> Router {
    let protected_routes = Router::new()
        .route("/doctors/{doctor_id}", get(subscribe_doctor))
        .route("/patients/{patient_id}", get(subscribe_patient))
        .route("/hospitals/{hospital_id}", get(subscribe_hospital))
        .route("/events", get(subscribe_all))
        .route("/active", get(get_active_subscriptions))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(protected_routes)
        .layer(Extension(notifier))
        .with_state(state)
}
