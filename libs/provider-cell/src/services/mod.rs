pub mod availability;
pub mod catalog;
pub mod schedule;
pub mod slots;

pub use availability::AvailabilityService;
pub use catalog::CatalogService;
pub use schedule::ScheduleService;
