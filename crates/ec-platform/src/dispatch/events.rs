//! Clinic Events
//!
//! Every side effect (notification write, email) starts from one of these.

use std::fmt;

use crate::appointment::operations::events::{
    AppointmentBooked, AppointmentUpdated, ConsultationCompleted, FeedbackSubmitted,
};

/// A string that never shows up in Debug output or logs
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatientRegistered {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorProvisioned {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub temporary_password: Secret,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ClinicEvent {
    AppointmentBooked(AppointmentBooked),
    AppointmentUpdated(AppointmentUpdated),
    ConsultationCompleted(ConsultationCompleted),
    FeedbackSubmitted(FeedbackSubmitted),
    PatientRegistered(PatientRegistered),
    DoctorProvisioned(DoctorProvisioned),
}

impl ClinicEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ClinicEvent::AppointmentBooked(_) => "appointment.booked",
            ClinicEvent::AppointmentUpdated(_) => "appointment.updated",
            ClinicEvent::ConsultationCompleted(_) => "consultation.completed",
            ClinicEvent::FeedbackSubmitted(_) => "feedback.submitted",
            ClinicEvent::PatientRegistered(_) => "patient.registered",
            ClinicEvent::DoctorProvisioned(_) => "doctor.provisioned",
        }
    }
}

macro_rules! impl_from_event {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ClinicEvent {
                fn from(event: $variant) -> Self {
                    ClinicEvent::$variant(event)
                }
            }
        )*
    };
}

impl_from_event!(
    AppointmentBooked,
    AppointmentUpdated,
    ConsultationCompleted,
    FeedbackSubmitted,
    PatientRegistered,
    DoctorProvisioned,
);
