//! Users API
//!
//! Profile views, the doctor directory, patient medical records and
//! hospital cards.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::appointment::repository::AppointmentRepository;
use crate::dispatch::blob::BlobStore;
use crate::shared::api_common::{invalid_form, non_empty, ok, parse_date_input, ApiResponse, JsonBody};
use crate::shared::error::{ClinicError, Result};
use crate::shared::ids::is_valid_id;
use crate::shared::middleware::Authenticated;
use crate::user::entity::{BloodGroup, Gender, Genotype, HospitalCard, MedicalRecord, Role, User};
use crate::user::repository::UserRepository;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordResponse {
    pub record_type: String,
    pub notes: String,
    pub recorded_at: DateTime<Utc>,
}

impl From<MedicalRecord> for MedicalRecordResponse {
    fn from(r: MedicalRecord) -> Self {
        Self {
            record_type: r.record_type,
            notes: r.notes,
            recorded_at: r.recorded_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HospitalCardResponse {
    pub address: String,
    pub image_url: String,
    pub issued_at: DateTime<Utc>,
}

impl From<HospitalCard> for HospitalCardResponse {
    fn from(c: HospitalCard) -> Self {
        Self {
            address: c.address,
            image_url: c.image_url,
            issued_at: c.issued_at,
        }
    }
}

/// A user profile. Never carries the password hash.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub role: Role,
    pub name: String,
    pub contact_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_speciality: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genotype: Option<Genotype>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hospital_card: Option<HospitalCardResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            role: u.role,
            name: u.name,
            contact_number: u.contact_number,
            primary_speciality: u.primary_speciality,
            date_of_birth: u.date_of_birth,
            gender: u.gender,
            blood_group: u.blood_group,
            genotype: u.genotype,
            hospital_card: u.hospital_card.map(Into::into),
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorEntry {
    pub id: String,
    pub name: String,
    pub speciality: String,
    pub email: String,
}

impl From<User> for DoctorEntry {
    fn from(u: User) -> Self {
        Self {
            name: u.display_name().unwrap_or("Unnamed Doctor").to_string(),
            speciality: u
                .primary_speciality
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "General Medicine".to_string()),
            id: u.id,
            email: u.email,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorListResponse {
    pub doctors: Vec<DoctorEntry>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecordsResponse {
    pub blood_group: Option<BloodGroup>,
    pub genotype: Option<Genotype>,
    pub records: Vec<MedicalRecordResponse>,
}

impl From<User> for MedicalRecordsResponse {
    fn from(u: User) -> Self {
        Self {
            blood_group: u.blood_group,
            genotype: u.genotype,
            records: u.medical_records.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddMedicalRecordRequest {
    pub record_type: Option<String>,
    pub notes: Option<String>,
    /// Defaults to now
    pub recorded_at: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVitalsRequest {
    /// A+, A-, B+, B-, AB+, AB-, O+ or O-
    pub blood_group: Option<String>,
    /// AA, AS, SS, AC, SC or CC
    pub genotype: Option<String>,
}

/// Hospital card form
#[derive(ToSchema)]
pub struct CardForm {
    pub address: String,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CardResponse {
    pub card: Option<HospitalCardResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PatientDetailResponse {
    pub patient: UserResponse,
    pub records: Vec<MedicalRecordResponse>,
}

#[derive(Clone)]
pub struct UsersState {
    pub users: Arc<dyn UserRepository>,
    pub appointments: Arc<dyn AppointmentRepository>,
    pub blobs: Arc<dyn BlobStore>,
}

impl UsersState {
    async fn caller(&self, auth: &Authenticated) -> Result<User> {
        self.users
            .find_by_id(&auth.user_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("User", &auth.user_id))
    }
}

/// Doctor directory
#[utoipa::path(
    get,
    path = "/doctors",
    tag = "users",
    operation_id = "getApiDoctors",
    responses(
        (status = 200, description = "All doctors", body = DoctorListResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_doctors(
    State(state): State<UsersState>,
    _auth: Authenticated,
) -> Result<Json<ApiResponse<DoctorListResponse>>> {
    let doctors = state.users.find_by_role(Role::Doctor).await?;
    Ok(ok(DoctorListResponse {
        doctors: doctors.into_iter().map(Into::into).collect(),
    }))
}

/// The caller's medical records
#[utoipa::path(
    get,
    path = "/medical-records",
    tag = "users",
    operation_id = "getApiMedicalRecords",
    responses(
        (status = 200, description = "Vitals and history", body = MedicalRecordsResponse),
        (status = 403, description = "Not a patient")
    ),
    security(("cookie_auth" = []))
)]
pub async fn get_medical_records(
    State(state): State<UsersState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<MedicalRecordsResponse>>> {
    auth.require_patient()?;
    let user = state.caller(&auth).await?;
    Ok(ok(user.into()))
}

/// Append a medical record entry
#[utoipa::path(
    post,
    path = "/medical-records",
    tag = "users",
    operation_id = "postApiMedicalRecords",
    request_body = AddMedicalRecordRequest,
    responses(
        (status = 201, description = "Record added", body = MedicalRecordsResponse),
        (status = 400, description = "Missing record type")
    ),
    security(("cookie_auth" = []))
)]
pub async fn add_medical_record(
    State(state): State<UsersState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<AddMedicalRecordRequest>,
) -> Result<(StatusCode, Json<ApiResponse<MedicalRecordsResponse>>)> {
    auth.require_patient()?;

    let record_type = non_empty(req.record_type).ok_or_else(|| ClinicError::validation("Record type is required"))?;
    let recorded_at = match non_empty(req.recorded_at) {
        Some(value) => parse_date_input(&value).ok_or_else(|| ClinicError::validation("Invalid record date"))?,
        None => Utc::now(),
    };

    let mut user = state.caller(&auth).await?;
    let record = user.add_medical_record(record_type, req.notes.unwrap_or_default().trim().to_string(), recorded_at);
    state.users.push_medical_record(&user.id, &record).await?;

    info!(user_id = %user.id, records = user.medical_records.len(), "Medical record added");

    Ok((StatusCode::CREATED, ok(user.into())))
}

/// Update blood group and genotype
#[utoipa::path(
    patch,
    path = "/medical-records",
    tag = "users",
    operation_id = "patchApiMedicalRecords",
    request_body = UpdateVitalsRequest,
    responses(
        (status = 200, description = "Vitals updated", body = MedicalRecordsResponse),
        (status = 400, description = "Nothing to update or unknown value")
    ),
    security(("cookie_auth" = []))
)]
pub async fn update_vitals(
    State(state): State<UsersState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<UpdateVitalsRequest>,
) -> Result<Json<ApiResponse<MedicalRecordsResponse>>> {
    auth.require_patient()?;

    let blood_group = non_empty(req.blood_group)
        .map(|v| BloodGroup::parse(&v).ok_or_else(|| ClinicError::validation("Invalid blood group")))
        .transpose()?;
    let genotype = non_empty(req.genotype)
        .map(|v| Genotype::parse(&v).ok_or_else(|| ClinicError::validation("Invalid genotype")))
        .transpose()?;
    if blood_group.is_none() && genotype.is_none() {
        return Err(ClinicError::validation("No valid fields"));
    }

    let mut user = state.caller(&auth).await?;
    if blood_group.is_some() {
        user.blood_group = blood_group;
    }
    if genotype.is_some() {
        user.genotype = genotype;
    }
    user.updated_at = Utc::now();
    state.users.update_vitals(&user).await?;

    Ok(ok(user.into()))
}

/// The caller's hospital card, if issued
#[utoipa::path(
    get,
    path = "/card",
    tag = "users",
    operation_id = "getApiCard",
    responses(
        (status = 200, description = "Hospital card or null", body = CardResponse),
        (status = 403, description = "Not a patient")
    ),
    security(("cookie_auth" = []))
)]
pub async fn get_card(
    State(state): State<UsersState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<CardResponse>>> {
    auth.require_patient()?;
    let user = state.caller(&auth).await?;
    Ok(ok(CardResponse {
        card: user.hospital_card.map(Into::into),
    }))
}

/// Issue a hospital card (multipart: `address`, `image`)
#[utoipa::path(
    post,
    path = "/card",
    tag = "users",
    operation_id = "postApiCard",
    request_body(content = CardForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Card issued", body = CardResponse),
        (status = 400, description = "Missing address or malformed form")
    ),
    security(("cookie_auth" = []))
)]
pub async fn issue_card(
    State(state): State<UsersState>,
    auth: Authenticated,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<ApiResponse<CardResponse>>)> {
    auth.require_patient()?;

    let mut multipart = multipart.map_err(invalid_form)?;

    let mut address = None;
    let mut image = None;
    while let Some(field) = multipart.next_field().await.map_err(invalid_form)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "address" => address = Some(field.text().await.map_err(invalid_form)?),
            "image" => {
                let content_type = field.content_type().map(String::from);
                let data = field.bytes().await.map_err(invalid_form)?;
                if !data.is_empty() {
                    image = Some((content_type, data));
                }
            }
            _ => {}
        }
    }

    let address = non_empty(address).ok_or_else(|| ClinicError::validation("Address is required"))?;
    let mut user = state.caller(&auth).await?;

    let image_url = match image {
        Some((content_type, data)) => {
            let key = format!("cards/{}-{}", user.id, Utc::now().timestamp_millis());
            state.blobs.put(&key, content_type.as_deref(), data).await?
        }
        None => String::new(),
    };

    user.issue_card(address, image_url);
    state.users.save_hospital_card(&user).await?;

    info!(user_id = %user.id, "Hospital card issued");

    Ok((
        StatusCode::CREATED,
        ok(CardResponse {
            card: user.hospital_card.map(Into::into),
        }),
    ))
}

/// A patient's profile and records, for a doctor who has seen them
#[utoipa::path(
    get,
    path = "/doctor/patients/{id}",
    tag = "users",
    operation_id = "getApiDoctorPatientsById",
    params(
        ("id" = String, Path, description = "Patient ID")
    ),
    responses(
        (status = 200, description = "Patient detail", body = PatientDetailResponse),
        (status = 404, description = "No such patient for this doctor")
    ),
    security(("cookie_auth" = []))
)]
pub async fn get_patient_detail(
    State(state): State<UsersState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<PatientDetailResponse>>> {
    auth.require_doctor()?;

    if !is_valid_id(&id) || !state.appointments.has_link(&auth.user_id, &id).await? {
        return Err(ClinicError::not_found("Patient", &id));
    }

    let mut patient = state
        .users
        .find_by_id(&id)
        .await?
        .filter(|u| u.role == Role::User)
        .ok_or_else(|| ClinicError::not_found("Patient", &id))?;

    let records = std::mem::take(&mut patient.medical_records)
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ok(PatientDetailResponse {
        patient: patient.into(),
        records,
    }))
}

pub fn users_router(state: UsersState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_doctors))
        .routes(routes!(get_medical_records, add_medical_record, update_vitals))
        .routes(routes!(get_card, issue_card))
        .routes(routes!(get_patient_detail))
        .with_state(state)
}
