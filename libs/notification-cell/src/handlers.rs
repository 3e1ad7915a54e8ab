use std::convert::Infallible;

use axum::{
    extract::Path,
    response::sse::{Event, KeepAlive, Sse},
    response::Json,
    Extension,
};
use futures::stream::Stream;
use serde_json::{json, Value};
use tokio::sync::broadcast::error::RecvError;
use tracing::info;
use uuid::Uuid;

use shared_models::{auth::User, error::AppError};

use crate::models::SubscriberScope;
use crate::services::notifier::{ChangeNotifier, EventReceiver};

/// Long-lived stream of schedule events for one doctor's calendar.
pub async fn subscribe_doctor(
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
    Path(doctor_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "Doctor subscription for {} from user: {}",
        doctor_id, user.id
    );

    let rx = notifier.subscribe(SubscriberScope::Doctor(doctor_id)).await;
    event_stream(rx)
}

pub async fn subscribe_patient(
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
    Path(patient_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "Patient subscription for {} from user: {}",
        patient_id, user.id
    );

    let rx = notifier
        .subscribe(SubscriberScope::Patient(patient_id))
        .await;
    event_stream(rx)
}

pub async fn subscribe_hospital(
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
    Path(hospital_id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!(
        "Hospital subscription for {} from user: {}",
        hospital_id, user.id
    );

    let rx = notifier
        .subscribe(SubscriberScope::Hospital(hospital_id))
        .await;
    event_stream(rx)
}

/// Firehose of every emitted event, for monitoring.
pub async fn subscribe_all(
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    info!("Global subscription from user: {}", user.id);

    event_stream(notifier.subscribe_global())
}

/// List scopes that currently have an open channel.
pub async fn get_active_subscriptions(
    Extension(user): Extension<User>,
    Extension(notifier): Extension<ChangeNotifier>,
) -> Result<Json<Value>, AppError> {
    info!("Active subscriptions request from user: {}", user.id);

    let scopes = notifier.active_scopes().await;
    Ok(Json(json!({
        "active_count": scopes.len(),
        "scopes": scopes,
    })))
}

/// Adapt a broadcast receiver into an SSE body. A lagged subscriber
/// skips the dropped messages and keeps reading; the stream ends when
/// the channel closes.
fn event_stream(rx: EventReceiver) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    let event = Event::default().event("schedule").data(message);
                    return Some((Ok(event), rx));
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
