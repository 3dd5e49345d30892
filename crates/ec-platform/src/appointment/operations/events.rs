//! Appointment Domain Events
//!
//! Returned by the lifecycle use cases and consumed by the dispatcher.

use chrono::{DateTime, Utc};

use crate::appointment::entity::DeliveryMode;

#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentBooked {
    pub appointment_id: String,
    pub patient_id: String,
    pub patient_name: String,
    pub doctor_id: String,
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentChange {
    Approved { mode: DeliveryMode },
    Rescheduled,
    Cancelled,
}

/// A doctor approved, rescheduled or cancelled an appointment
#[derive(Debug, Clone, PartialEq)]
pub struct AppointmentUpdated {
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub change: AppointmentChange,
    /// After the change
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConsultationCompleted {
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_for: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSubmitted {
    pub appointment_id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub rating: u8,
    pub reported: bool,
}
