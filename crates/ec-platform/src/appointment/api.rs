//! Appointments API
//!
//! Patient booking, doctor actions, consultations, feedback and the admin
//! overview.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header::CONTENT_TYPE, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::appointment::entity::{Appointment, AppointmentStatus, Consultation, DeliveryMode, Feedback};
use crate::appointment::operations::{
    AppointmentChange, BookAppointmentCommand, BookAppointmentUseCase, DoctorActionCommand, DoctorActionUseCase,
    SubmitConsultationCommand, SubmitConsultationUseCase, SubmitFeedbackCommand, SubmitFeedbackUseCase,
    UploadedFile,
};
use crate::appointment::repository::AppointmentRepository;
use crate::dispatch::blob::BlobStore;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::shared::api_common::{invalid_form, lenient, ok, Ack, ApiResponse, JsonBody};
use crate::shared::error::Result;
use crate::shared::middleware::Authenticated;
use crate::user::entity::User;
use crate::user::repository::UserRepository;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DoctorSummary {
    pub id: String,
    pub name: String,
    pub speciality: String,
}

impl DoctorSummary {
    fn of(id: &str, doctor: Option<&User>) -> Self {
        Self {
            id: id.to_string(),
            name: doctor
                .and_then(|d| d.display_name())
                .unwrap_or("Unknown")
                .to_string(),
            speciality: doctor
                .and_then(|d| d.primary_speciality.clone())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "General".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientSummary {
    pub id: String,
    pub name: String,
    pub email: String,
    pub contact_number: String,
}

impl PatientSummary {
    fn of(id: &str, patient: Option<&User>) -> Self {
        Self {
            id: id.to_string(),
            name: patient.map(|p| p.name.clone()).unwrap_or_default(),
            email: patient.map(|p| p.email.clone()).unwrap_or_default(),
            contact_number: patient.map(|p| p.contact_number.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub rating: u8,
    pub comments: String,
    pub reported: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Feedback> for FeedbackResponse {
    fn from(f: Feedback) -> Self {
        Self {
            rating: f.rating,
            comments: f.comments,
            reported: f.reported,
            created_at: f.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationNotes {
    pub presenting_symptoms: String,
    pub diagnosis: String,
    pub prescription: String,
    pub advice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up_date: Option<DateTime<Utc>>,
    pub attachments: Vec<String>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Consultation> for ConsultationNotes {
    fn from(c: Consultation) -> Self {
        Self {
            presenting_symptoms: c.presenting_symptoms,
            diagnosis: c.diagnosis,
            prescription: c.prescription,
            advice: c.advice,
            follow_up_date: c.follow_up_date,
            attachments: c.attachments,
            completed: c.completed,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentResponse {
    pub id: String,
    pub patient_id: String,
    pub doctor_id: String,
    pub scheduled_for: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeliveryMode>,
    pub notes: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consultation: Option<ConsultationNotes>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doctor: Option<DoctorSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patient: Option<PatientSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Appointment> for AppointmentResponse {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            patient_id: a.user_id,
            doctor_id: a.doctor_id,
            scheduled_for: a.scheduled_for,
            status: a.status,
            mode: a.mode,
            notes: a.notes,
            feedback: a.feedback.map(Into::into),
            consultation: a.consultation.map(Into::into),
            doctor: None,
            patient: None,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AppointmentListResponse {
    pub appointments: Vec<AppointmentResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookedResponse {
    pub id: String,
    pub email_sent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ActionResponse {
    pub id: String,
    pub status: AppointmentStatus,
    pub email_sent: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ConsultationResponse {
    pub id: String,
    pub attachments: Vec<String>,
    pub completed: bool,
}

/// Appointments service state
#[derive(Clone)]
pub struct AppointmentsState {
    pub users: Arc<dyn UserRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub blobs: Arc<dyn BlobStore>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// Look up the users referenced by a batch of appointments
async fn user_index<'a>(
    users: &dyn UserRepository,
    ids: impl Iterator<Item = &'a String>,
) -> Result<HashMap<String, User>> {
    let mut ids: Vec<String> = ids.cloned().collect();
    ids.sort();
    ids.dedup();
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(users
        .find_by_ids(&ids)
        .await?
        .into_iter()
        .map(|u| (u.id.clone(), u))
        .collect())
}

/// List the caller's appointments
#[utoipa::path(
    get,
    path = "/appointments",
    tag = "appointments",
    operation_id = "getApiAppointments",
    responses(
        (status = 200, description = "Own appointments, soonest first", body = AppointmentListResponse),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not a patient")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_own_appointments(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<AppointmentListResponse>>> {
    auth.require_patient()?;

    let appointments = state.appointments.list_by_patient(&auth.user_id).await?;
    let doctors = user_index(state.users.as_ref(), appointments.iter().map(|a| &a.doctor_id)).await?;

    let appointments = appointments
        .into_iter()
        .map(|a| {
            let doctor = DoctorSummary::of(&a.doctor_id, doctors.get(&a.doctor_id));
            AppointmentResponse {
                doctor: Some(doctor),
                ..a.into()
            }
        })
        .collect();

    Ok(ok(AppointmentListResponse { appointments }))
}

/// Book an appointment
#[utoipa::path(
    post,
    path = "/appointments",
    tag = "appointments",
    operation_id = "postApiAppointments",
    request_body = BookAppointmentCommand,
    responses(
        (status = 201, description = "Appointment booked", body = BookedResponse),
        (status = 400, description = "Missing or invalid fields"),
        (status = 404, description = "Doctor not found")
    ),
    security(("cookie_auth" = []))
)]
pub async fn book_appointment(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
    JsonBody(mut command): JsonBody<BookAppointmentCommand>,
) -> Result<(StatusCode, Json<ApiResponse<BookedResponse>>)> {
    auth.require_patient()?;
    command.patient_id = auth.user_id.clone();

    let use_case = BookAppointmentUseCase::new(state.users.clone(), state.appointments.clone());
    let event = use_case.execute(command).await?;
    let id = event.appointment_id.clone();

    let report = state.dispatcher.dispatch(&event.into()).await;

    Ok((
        StatusCode::CREATED,
        ok(BookedResponse {
            id,
            email_sent: report.email_sent,
        }),
    ))
}

/// List the doctor's appointments
#[utoipa::path(
    get,
    path = "/doctor/appointments",
    tag = "appointments",
    operation_id = "getApiDoctorAppointments",
    responses(
        (status = 200, description = "Doctor's appointments, soonest first", body = AppointmentListResponse),
        (status = 403, description = "Not a doctor")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_doctor_appointments(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<AppointmentListResponse>>> {
    auth.require_doctor()?;

    let appointments = state.appointments.list_by_doctor(&auth.user_id).await?;
    let patients = user_index(state.users.as_ref(), appointments.iter().map(|a| &a.user_id)).await?;

    let appointments = appointments
        .into_iter()
        .map(|a| {
            let patient = PatientSummary::of(&a.user_id, patients.get(&a.user_id));
            AppointmentResponse {
                patient: Some(patient),
                ..a.into()
            }
        })
        .collect();

    Ok(ok(AppointmentListResponse { appointments }))
}

/// Approve, reschedule or cancel an appointment
#[utoipa::path(
    patch,
    path = "/doctor/appointments",
    tag = "appointments",
    operation_id = "patchApiDoctorAppointments",
    request_body = DoctorActionCommand,
    responses(
        (status = 200, description = "Appointment updated", body = ActionResponse),
        (status = 400, description = "Invalid action, mode or date"),
        (status = 404, description = "Appointment not found for this doctor"),
        (status = 409, description = "Appointment already completed or cancelled")
    ),
    security(("cookie_auth" = []))
)]
pub async fn act_on_appointment(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
    JsonBody(mut command): JsonBody<DoctorActionCommand>,
) -> Result<Json<ApiResponse<ActionResponse>>> {
    auth.require_doctor()?;
    command.doctor_id = auth.user_id.clone();

    let use_case = DoctorActionUseCase::new(state.appointments.clone());
    let event = use_case.execute(command).await?;
    let id = event.appointment_id.clone();
    let status = match event.change {
        AppointmentChange::Approved { .. } => AppointmentStatus::Approved,
        AppointmentChange::Rescheduled => AppointmentStatus::Rescheduled,
        AppointmentChange::Cancelled => AppointmentStatus::Cancelled,
    };

    let report = state.dispatcher.dispatch(&event.into()).await;

    Ok(ok(ActionResponse {
        id,
        status,
        email_sent: report.email_sent,
    }))
}

fn is_multipart(request: &Request) -> bool {
    request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("multipart/form-data"))
}

/// Read a consultation form: text fields plus any number of `files` parts.
async fn read_consultation_form(mut multipart: Multipart) -> Result<SubmitConsultationCommand> {
    let mut command = SubmitConsultationCommand::default();

    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();

        if name == "files" || name == "files[]" {
            let file_name = field.file_name().unwrap_or("file").to_string();
            let content_type = field.content_type().map(String::from);
            let data = field.bytes().await.map_err(invalid_form)?;
            if !data.is_empty() {
                command.files.push(UploadedFile {
                    file_name,
                    content_type,
                    data,
                });
            }
            continue;
        }

        let value = field.text().await.map_err(invalid_form)?;
        match name.as_str() {
            "appointmentId" => command.appointment_id = Some(value),
            "presentingSymptoms" => command.presenting_symptoms = Some(value),
            "diagnosis" => command.diagnosis = Some(value),
            "prescription" => command.prescription = Some(value),
            "advice" => command.advice = Some(value),
            "followUpDate" => command.follow_up_date = Some(value),
            "completed" => command.completed = Some(lenient::parse_flag(&value)),
            _ => {}
        }
    }

    Ok(command)
}

/// Submit consultation notes (JSON or multipart with `files`)
#[utoipa::path(
    post,
    path = "/consultations",
    tag = "appointments",
    operation_id = "postApiConsultations",
    request_body = SubmitConsultationCommand,
    responses(
        (status = 200, description = "Consultation recorded", body = ConsultationResponse),
        (status = 400, description = "Invalid body"),
        (status = 404, description = "Appointment not found for this doctor")
    ),
    security(("cookie_auth" = []))
)]
pub async fn submit_consultation(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
    request: Request,
) -> Result<Json<ApiResponse<ConsultationResponse>>> {
    auth.require_doctor()?;

    let mut command = if is_multipart(&request) {
        let multipart = Multipart::from_request(request, &()).await.map_err(invalid_form)?;
        read_consultation_form(multipart).await?
    } else {
        let JsonBody(command) = JsonBody::<SubmitConsultationCommand>::from_request(request, &()).await?;
        command
    };
    command.doctor_id = auth.user_id.clone();

    let use_case = SubmitConsultationUseCase::new(state.appointments.clone(), state.blobs.clone());
    let recorded = use_case.execute(command).await?;

    let completed = recorded.completed.is_some();
    if let Some(event) = recorded.completed {
        state.dispatcher.dispatch(&event.into()).await;
    }

    Ok(ok(ConsultationResponse {
        id: recorded.appointment_id,
        attachments: recorded.attachments,
        completed,
    }))
}

/// Rate a consultation
#[utoipa::path(
    post,
    path = "/feedback",
    tag = "appointments",
    operation_id = "postApiFeedback",
    request_body = SubmitFeedbackCommand,
    responses(
        (status = 200, description = "Feedback recorded", body = Ack),
        (status = 400, description = "Rating outside 1 to 5"),
        (status = 404, description = "Appointment not found for this patient")
    ),
    security(("cookie_auth" = []))
)]
pub async fn submit_feedback(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
    JsonBody(mut command): JsonBody<SubmitFeedbackCommand>,
) -> Result<Json<ApiResponse<Ack>>> {
    auth.require_patient()?;
    command.patient_id = auth.user_id.clone();

    let use_case = SubmitFeedbackUseCase::new(state.appointments.clone());
    let event = use_case.execute(command).await?;
    state.dispatcher.dispatch(&event.into()).await;

    Ok(ok(Ack::default()))
}

/// All appointments, latest first
#[utoipa::path(
    get,
    path = "/admin/appointments",
    tag = "admin",
    operation_id = "getApiAdminAppointments",
    responses(
        (status = 200, description = "All appointments", body = AppointmentListResponse),
        (status = 403, description = "Not an admin")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_all_appointments(
    State(state): State<AppointmentsState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<AppointmentListResponse>>> {
    auth.require_admin()?;

    let appointments = state.appointments.list_all().await?;
    let users = user_index(
        state.users.as_ref(),
        appointments.iter().flat_map(|a| [&a.user_id, &a.doctor_id]),
    )
    .await?;

    let appointments = appointments
        .into_iter()
        .map(|a| {
            let doctor = DoctorSummary::of(&a.doctor_id, users.get(&a.doctor_id));
            let patient = PatientSummary::of(&a.user_id, users.get(&a.user_id));
            AppointmentResponse {
                doctor: Some(doctor),
                patient: Some(patient),
                ..a.into()
            }
        })
        .collect();

    Ok(ok(AppointmentListResponse { appointments }))
}

/// Create the appointments router
pub fn appointments_router(state: AppointmentsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_own_appointments, book_appointment))
        .routes(routes!(list_doctor_appointments, act_on_appointment))
        .routes(routes!(submit_consultation))
        .routes(routes!(submit_feedback))
        .routes(routes!(list_all_appointments))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doctor_summary_defaults() {
        let summary = DoctorSummary::of("D1", None);
        assert_eq!(summary.name, "Unknown");
        assert_eq!(summary.speciality, "General");

        let doctor = User::new("doc@clinic.com", "hash", crate::user::entity::Role::Doctor)
            .with_name("Dr House")
            .with_speciality("Diagnostics");
        let summary = DoctorSummary::of(&doctor.id, Some(&doctor));
        assert_eq!(summary.name, "Dr House");
        assert_eq!(summary.speciality, "Diagnostics");
    }

    #[test]
    fn test_response_renames_patient_id() {
        let appointment = Appointment::book("P1", "D1", Utc::now(), "");
        let json = serde_json::to_value(AppointmentResponse::from(appointment)).unwrap();
        assert_eq!(json["patientId"], "P1");
        assert_eq!(json["status"], "scheduled");
        assert!(json.get("mode").is_none());
        assert!(json.get("doctor").is_none());
    }
}
