//! Submit Feedback Use Case

use std::sync::Arc;

use serde::Deserialize;
use utoipa::ToSchema;
use tracing::info;

use crate::appointment::entity::parse_rating;
use crate::appointment::repository::AppointmentRepository;
use crate::shared::api_common::{lenient, non_empty};
use crate::shared::error::{ClinicError, Result};

use super::events::FeedbackSubmitted;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitFeedbackCommand {
    #[serde(skip)]
    pub patient_id: String,
    pub appointment_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::f64_opt")]
    pub rating: Option<f64>,
    pub comments: Option<String>,
    /// Flag the consultation for admin review
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub report: Option<bool>,
}

pub struct SubmitFeedbackUseCase {
    appointments: Arc<dyn AppointmentRepository>,
}

impl SubmitFeedbackUseCase {
    pub fn new(appointments: Arc<dyn AppointmentRepository>) -> Self {
        Self { appointments }
    }

    pub async fn execute(&self, command: SubmitFeedbackCommand) -> Result<FeedbackSubmitted> {
        let appointment_id = non_empty(command.appointment_id)
            .ok_or_else(|| ClinicError::validation("Missing appointment id"))?;
        let rating = command
            .rating
            .ok_or_else(|| ClinicError::validation("Rating must be between 1 and 5"))
            .and_then(parse_rating)?;

        let mut appointment = self
            .appointments
            .find_for_patient(&appointment_id, &command.patient_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Appointment", &appointment_id))?;

        let reported = command.report.unwrap_or(false);
        appointment.record_feedback(rating, command.comments.unwrap_or_default().trim().to_string(), reported);
        self.appointments.save_feedback(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            patient_id = %appointment.user_id,
            rating,
            reported,
            "Feedback submitted"
        );

        Ok(FeedbackSubmitted {
            appointment_id: appointment.id,
            patient_id: appointment.user_id,
            doctor_id: appointment.doctor_id,
            rating,
            reported,
        })
    }
}
