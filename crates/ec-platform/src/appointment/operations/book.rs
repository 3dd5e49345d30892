//! Book Appointment Use Case

use std::sync::Arc;

use serde::Deserialize;
use utoipa::ToSchema;
use tracing::info;

use crate::appointment::entity::{parse_schedule, Appointment};
use crate::appointment::repository::AppointmentRepository;
use crate::shared::api_common::non_empty;
use crate::shared::error::{ClinicError, Result};
use crate::user::repository::UserRepository;

use super::events::AppointmentBooked;

/// Command for booking an appointment as a patient.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookAppointmentCommand {
    #[serde(skip)]
    pub patient_id: String,
    pub doctor_id: Option<String>,
    /// YYYY-MM-DD
    pub date: Option<String>,
    /// HH:MM
    pub time: Option<String>,
    pub notes: Option<String>,
}

pub struct BookAppointmentUseCase {
    users: Arc<dyn UserRepository>,
    appointments: Arc<dyn AppointmentRepository>,
}

impl BookAppointmentUseCase {
    pub fn new(users: Arc<dyn UserRepository>, appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { users, appointments }
    }

    pub async fn execute(&self, command: BookAppointmentCommand) -> Result<AppointmentBooked> {
        let (Some(doctor_id), Some(date), Some(time)) = (
            non_empty(command.doctor_id),
            non_empty(command.date),
            non_empty(command.time),
        ) else {
            return Err(ClinicError::validation("Missing fields"));
        };

        let scheduled_for = parse_schedule(&date, &time)?;

        // The doctor must exist before anything is written
        if self.users.find_doctor(&doctor_id).await?.is_none() {
            return Err(ClinicError::not_found("Doctor", &doctor_id));
        }

        let patient_name = self
            .users
            .find_by_id(&command.patient_id)
            .await?
            .map(|p| p.name)
            .unwrap_or_default();

        let appointment = Appointment::book(
            &command.patient_id,
            &doctor_id,
            scheduled_for,
            command.notes.unwrap_or_default().trim(),
        );
        self.appointments.insert(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.user_id,
            doctor_id = %appointment.doctor_id,
            scheduled_for = %appointment.scheduled_for,
            "Appointment booked"
        );

        Ok(AppointmentBooked {
            appointment_id: appointment.id,
            patient_id: appointment.user_id,
            patient_name,
            doctor_id: appointment.doctor_id,
            scheduled_for: appointment.scheduled_for,
        })
    }
}
