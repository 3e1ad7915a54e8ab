pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

pub use models::*;
pub use router::create_scheduling_router;
pub use services::*;
pub use store::{PostgrestScheduleStore, ScheduleStore, StoreError};
