pub mod allocator;
pub mod availability;
pub mod booking;
pub mod capacity;
pub mod clock;
pub mod slots;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use clock::CivilClock;
pub use slots::SlotService;
