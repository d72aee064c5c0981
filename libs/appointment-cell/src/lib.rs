pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

// Re-export the types other cells work with
pub use models::{
    Appointment, AppointmentDetails, AppointmentError, AppointmentItem, AppointmentStatus,
    NewAppointment, StatusFilter,
};
pub use router::{appointment_routes, patient_routes, provider_portal_routes};
pub use services::{AppointmentLifecycleService, AppointmentQueryService, BookingService};
