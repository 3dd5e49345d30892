//! Doctor Action Use Case
//!
//! Approve, reschedule or cancel one of the doctor's own appointments.

use std::sync::Arc;

use serde::Deserialize;
use utoipa::ToSchema;
use tracing::info;

use crate::appointment::entity::{parse_schedule, DeliveryMode, DoctorAction};
use crate::appointment::repository::AppointmentRepository;
use crate::shared::api_common::non_empty;
use crate::shared::error::{ClinicError, Result};

use super::events::{AppointmentChange, AppointmentUpdated};

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorActionCommand {
    #[serde(skip)]
    pub doctor_id: String,
    #[serde(rename = "id", alias = "appointmentId")]
    pub appointment_id: Option<String>,
    /// approve | reschedule | cancel
    pub action: Option<String>,
    /// Required for approve
    pub mode: Option<String>,
    /// Required for reschedule
    pub date: Option<String>,
    pub time: Option<String>,
}

impl DoctorActionCommand {
    fn parse_action(&self) -> Result<DoctorAction> {
        let action = self.action.as_deref().map(str::trim).unwrap_or_default();
        match action.to_ascii_lowercase().as_str() {
            "approve" => {
                let mode = self
                    .mode
                    .as_deref()
                    .and_then(DeliveryMode::parse)
                    .ok_or_else(|| ClinicError::validation("Mode must be physical or online"))?;
                Ok(DoctorAction::Approve { mode })
            }
            "reschedule" => {
                let (Some(date), Some(time)) = (non_empty(self.date.clone()), non_empty(self.time.clone()))
                else {
                    return Err(ClinicError::validation("Date and time are required to reschedule"));
                };
                Ok(DoctorAction::Reschedule {
                    scheduled_for: parse_schedule(&date, &time)?,
                })
            }
            "cancel" => Ok(DoctorAction::Cancel),
            _ => Err(ClinicError::validation("Invalid action")),
        }
    }
}

pub struct DoctorActionUseCase {
    appointments: Arc<dyn AppointmentRepository>,
}

impl DoctorActionUseCase {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    pub async fn execute(&self, command: DoctorActionCommand) -> Result<AppointmentUpdated> {
        let appointment_id = non_empty(command.appointment_id.clone())
            .ok_or_else(|| ClinicError::validation("Missing appointment id"))?;

        // Ownership is checked first so a foreign doctor learns nothing
        // about the appointment, whatever the action.
        let mut appointment = self
            .appointments
            .find_for_doctor(&appointment_id, &command.doctor_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Appointment", &appointment_id))?;

        let action = command.parse_action()?;
        appointment.apply(&action)?;
        self.appointments.save_decision(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            action = action.name(),
            status = appointment.status.as_str(),
            "Appointment updated by doctor"
        );

        let change = match action {
            DoctorAction::Approve { mode } => AppointmentChange::Approved { mode },
            DoctorAction::Reschedule { .. } => AppointmentChange::Rescheduled,
            DoctorAction::Cancel => AppointmentChange::Cancelled,
        };

        Ok(AppointmentUpdated {
            appointment_id: appointment.id,
            patient_id: appointment.user_id,
            doctor_id: appointment.doctor_id,
            change,
            scheduled_for: appointment.scheduled_for,
        })
    }
}
