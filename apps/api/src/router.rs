use std::sync::Arc;

use axum::{routing::get, Router};

use notification_cell::{create_notification_router, ChangeNotifier};
use scheduling_cell::create_scheduling_router;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>, notifier: ChangeNotifier) -> Router {
    Router::new()
        .route("/", get(|| async { "Scheduling API is running!" }))
        .nest(
            "/scheduling",
            create_scheduling_router(state.clone(), notifier.clone()),
        )
        .nest(
            "/subscriptions",
            create_notification_router(state.clone(), notifier),
        )
}
