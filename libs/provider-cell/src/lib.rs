pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export the types other cells work with
pub use models::{
    Bookable, BookableKind, BookableRef, OperatingHour, Package, Provider, ProviderError,
    Service,
};
pub use router::{provider_routes, schedule_routes};
pub use services::{AvailabilityService, CatalogService, ScheduleService};
