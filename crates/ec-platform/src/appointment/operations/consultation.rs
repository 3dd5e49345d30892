//! Submit Consultation Use Case

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use utoipa::ToSchema;
use tracing::info;

use crate::appointment::entity::{AppointmentStatus, Consultation};
use crate::appointment::repository::AppointmentRepository;
use crate::dispatch::blob::{sanitize_file_name, BlobStore};
use crate::shared::api_common::{lenient, non_empty, parse_date_input};
use crate::shared::error::{ClinicError, Result};

use super::events::ConsultationCompleted;

/// A file part received with the consultation form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub data: Bytes,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmitConsultationCommand {
    #[serde(skip)]
    pub doctor_id: String,
    pub appointment_id: Option<String>,
    pub presenting_symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub prescription: Option<String>,
    pub advice: Option<String>,
    /// YYYY-MM-DD or RFC 3339
    pub follow_up_date: Option<String>,
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub completed: Option<bool>,
    #[serde(skip)]
    pub files: Vec<UploadedFile>,
}

/// Outcome of a consultation submission
#[derive(Debug, Clone)]
pub struct ConsultationRecorded {
    pub appointment_id: String,
    pub attachments: Vec<String>,
    /// Set when this submission moved the appointment to completed
    pub completed: Option<ConsultationCompleted>,
}

/// An unreadable follow-up date is dropped rather than rejected
fn parse_follow_up(value: Option<String>) -> Option<DateTime<Utc>> {
    non_empty(value).and_then(|d| parse_date_input(&d))
}

fn clean(value: Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

pub struct SubmitConsultationUseCase {
    appointments: Arc<dyn AppointmentRepository>,
    blobs: Arc<dyn BlobStore>,
}

impl SubmitConsultationUseCase {
    pub fn new(appointments: Arc<dyn AppointmentRepository>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { appointments, blobs }
    }

    pub async fn execute(&self, command: SubmitConsultationCommand) -> Result<ConsultationRecorded> {
        let appointment_id = non_empty(command.appointment_id)
            .ok_or_else(|| ClinicError::validation("Missing appointment id"))?;

        let mut appointment = self
            .appointments
            .find_for_doctor(&appointment_id, &command.doctor_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("Appointment", &appointment_id))?;

        let follow_up_date = parse_follow_up(command.follow_up_date);

        let millis = Utc::now().timestamp_millis();
        let mut attachments = Vec::with_capacity(command.files.len());
        for (index, file) in command.files.into_iter().enumerate() {
            let key = format!(
                "consultations/{}-{}-{}-{}",
                appointment.id,
                millis,
                index,
                sanitize_file_name(&file.file_name)
            );
            let url = self.blobs.put(&key, file.content_type.as_deref(), file.data).await?;
            attachments.push(url);
        }

        let was_completed = appointment.status == AppointmentStatus::Completed;
        let consultation = Consultation {
            presenting_symptoms: clean(command.presenting_symptoms),
            diagnosis: clean(command.diagnosis),
            prescription: clean(command.prescription),
            advice: clean(command.advice),
            follow_up_date,
            attachments: attachments.clone(),
            completed: command.completed.unwrap_or(false),
            updated_at: None,
        };
        let completed_now = appointment.record_consultation(consultation) && !was_completed;

        self.appointments.save_consultation(&appointment).await?;

        info!(
            appointment_id = %appointment.id,
            doctor_id = %appointment.doctor_id,
            attachments = attachments.len(),
            status = appointment.status.as_str(),
            "Consultation recorded"
        );

        let completed = completed_now.then(|| ConsultationCompleted {
            appointment_id: appointment.id.clone(),
            patient_id: appointment.user_id.clone(),
            doctor_id: appointment.doctor_id.clone(),
            scheduled_for: appointment.scheduled_for,
        });

        Ok(ConsultationRecorded {
            appointment_id: appointment.id,
            attachments,
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_follow_up() {
        assert_eq!(
            parse_follow_up(Some("2025-05-01".into())),
            Some(Utc.with_ymd_and_hms(2025, 5, 1, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_follow_up(Some("next week".into())), None);
        assert_eq!(parse_follow_up(Some("  ".into())), None);
        assert_eq!(parse_follow_up(None), None);
    }

    #[test]
    fn test_clinical_text_is_trimmed() {
        assert_eq!(clean(Some("  Migraine \n".into())), "Migraine");
        assert_eq!(clean(None), "");
    }

    #[test]
    fn test_completed_accepts_string() {
        let cmd: SubmitConsultationCommand =
            serde_json::from_str(r#"{"appointmentId":"A1","completed":"true"}"#).unwrap();
        assert_eq!(cmd.completed, Some(true));
        assert!(cmd.files.is_empty());
    }
}
