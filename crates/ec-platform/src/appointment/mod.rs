//! Appointment Aggregate
//!
//! Booking and the appointment lifecycle.

pub mod entity;
pub mod repository;
pub mod api;
pub mod operations;

pub use entity::{Appointment, AppointmentStatus, Consultation, DeliveryMode, DoctorAction, Feedback};
pub use repository::{AppointmentRepository, MongoAppointmentRepository};
pub use api::{appointments_router, AppointmentsState};
