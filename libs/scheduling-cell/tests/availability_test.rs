mod support;

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use uuid::Uuid;

use scheduling_cell::models::{AppointmentStatus, SlotStatus};
use scheduling_cell::services::AvailabilityService;

use support::{InMemoryScheduleStore, TEST_TOKEN};

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2030, 6, 3).unwrap()
}

fn t(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

#[tokio::test]
async fn default_window_when_no_slots_published() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = AvailabilityService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    let reports = service
        .get_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();

    // 09:00 through 21:00, default period 15 => capacity 4
    assert_eq!(reports.len(), 13);
    assert_eq!(reports.first().unwrap().hour, 9);
    assert_eq!(reports.last().unwrap().hour, 21);
    assert!(reports.iter().all(|r| r.capacity == 4 && !r.is_full));
    assert_eq!(reports[0].label_from, "09:00");
    assert_eq!(reports[0].label_to, "10:00");
}

#[tokio::test]
async fn published_slots_define_the_reporting_hours() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = AvailabilityService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    store.seed_slot(doctor_id, day(), t(10, 0), SlotStatus::Available);
    store.seed_slot(doctor_id, day(), t(10, 30), SlotStatus::Available);
    store.seed_slot(doctor_id, day(), t(14, 0), SlotStatus::Available);
    // Cancelled slots do not contribute reporting hours.
    store.seed_slot(doctor_id, day(), t(18, 0), SlotStatus::Cancelled);

    let reports = service
        .get_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();

    let hours: Vec<u32> = reports.iter().map(|r| r.hour).collect();
    assert_eq!(hours, vec![10, 14]);
}

#[tokio::test]
async fn booked_counts_and_fullness_reflect_appointments() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = AvailabilityService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    store.seed_config(doctor_id, 30);

    for minute in [0, 30] {
        store.seed_appointment(
            Uuid::new_v4(),
            doctor_id,
            day(),
            t(10, minute),
            AppointmentStatus::Confirmed,
        );
    }
    store.seed_appointment(
        Uuid::new_v4(),
        doctor_id,
        day(),
        t(11, 0),
        AppointmentStatus::Pending,
    );
    // Cancelled appointments free their slot.
    store.seed_appointment(
        Uuid::new_v4(),
        doctor_id,
        day(),
        t(11, 30),
        AppointmentStatus::Cancelled,
    );

    let reports = service
        .get_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();

    let ten = reports.iter().find(|r| r.hour == 10).unwrap();
    assert_eq!(ten.capacity, 2);
    assert_eq!(ten.booked_count, 2);
    assert!(ten.is_full);

    let eleven = reports.iter().find(|r| r.hour == 11).unwrap();
    assert_eq!(eleven.booked_count, 1);
    assert!(!eleven.is_full);
}

#[tokio::test]
async fn off_boundary_appointments_do_not_consume_sub_slots() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = AvailabilityService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    // Period change to 30 strands an earlier 10:15 booking off the new
    // boundaries; it must not count against {10:00, 10:30}.
    store.seed_config(doctor_id, 30);
    store.seed_appointment(
        Uuid::new_v4(),
        doctor_id,
        day(),
        t(10, 15),
        AppointmentStatus::Confirmed,
    );
    store.seed_appointment(
        Uuid::new_v4(),
        doctor_id,
        day(),
        t(10, 30),
        AppointmentStatus::Confirmed,
    );

    let reports = service
        .get_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();

    let ten = reports.iter().find(|r| r.hour == 10).unwrap();
    assert_eq!(ten.capacity, 2);
    assert_eq!(ten.booked_count, 1);
    assert!(!ten.is_full);
}

#[tokio::test]
async fn rereading_without_writes_is_idempotent() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = AvailabilityService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    store.seed_slot(doctor_id, day(), t(9, 0), SlotStatus::Available);
    store.seed_appointment(
        Uuid::new_v4(),
        doctor_id,
        day(),
        t(9, 15),
        AppointmentStatus::Confirmed,
    );

    let first = service
        .get_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();
    let second = service
        .get_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn slots_and_availability_lists_only_bookable_times() {
    let store = Arc::new(InMemoryScheduleStore::new());
    let service = AvailabilityService::new(store.clone());
    let doctor_id = Uuid::new_v4();

    store.seed_slot(doctor_id, day(), t(10, 0), SlotStatus::Available);
    store.seed_slot(doctor_id, day(), t(10, 15), SlotStatus::Booked);
    store.seed_slot(doctor_id, day(), t(10, 30), SlotStatus::Cancelled);

    let result = service
        .get_slots_and_availability(doctor_id, day(), TEST_TOKEN)
        .await
        .unwrap();

    assert_eq!(result.published_slot_times, vec![t(10, 0)]);
    assert!(!result.reports.is_empty());
}
