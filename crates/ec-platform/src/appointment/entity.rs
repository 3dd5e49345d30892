//! Appointment Entity
//!
//! An appointment moves through a small state machine:
//!
//! ```text
//! scheduled ──approve──▶ approved
//!     │  ▲                  │
//!     │  └──reschedule──────┤   (reschedule may recur)
//!     ▼                     ▼
//! cancelled            completed (via consultation, from any state)
//! ```
//!
//! Doctor actions are rejected once the appointment is completed or
//! cancelled. A completed consultation forces `completed` regardless of
//! the previous status.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::error::{ClinicError, Result};
use crate::shared::ids::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Approved,
    Rescheduled,
    Completed,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, AppointmentStatus::Completed | AppointmentStatus::Cancelled)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Physical,
    Online,
}

impl DeliveryMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "physical" => Some(DeliveryMode::Physical),
            "online" => Some(DeliveryMode::Online),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Physical => "physical",
            DeliveryMode::Online => "online",
        }
    }
}

/// Patient feedback on an appointment
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    /// 1 to 5
    pub rating: u8,
    #[serde(default)]
    pub comments: String,
    #[serde(default)]
    pub reported: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// Doctor's consultation notes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consultation {
    #[serde(default)]
    pub presenting_symptoms: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub prescription: String,
    #[serde(default)]
    pub advice: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub follow_up_date: Option<DateTime<Utc>>,
    /// URLs of uploaded files
    #[serde(default)]
    pub attachments: Vec<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "bson::serde_helpers::chrono_datetime_as_bson_datetime_optional"
    )]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    #[serde(rename = "_id")]
    pub id: String,

    /// Owning patient
    pub user_id: String,

    pub doctor_id: String,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub scheduled_for: DateTime<Utc>,

    #[serde(default)]
    pub status: AppointmentStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<DeliveryMode>,

    #[serde(default)]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultation: Option<Consultation>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

/// A doctor's decision on an appointment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DoctorAction {
    Approve { mode: DeliveryMode },
    Reschedule { scheduled_for: DateTime<Utc> },
    Cancel,
}

impl DoctorAction {
    pub fn name(&self) -> &'static str {
        match self {
            DoctorAction::Approve { .. } => "approve",
            DoctorAction::Reschedule { .. } => "reschedule",
            DoctorAction::Cancel => "cancel",
        }
    }
}

impl Appointment {
    pub fn book(
        patient_id: impl Into<String>,
        doctor_id: impl Into<String>,
        scheduled_for: DateTime<Utc>,
        notes: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            user_id: patient_id.into(),
            doctor_id: doctor_id.into(),
            scheduled_for,
            status: AppointmentStatus::Scheduled,
            mode: None,
            notes: notes.into(),
            feedback: None,
            consultation: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a doctor action. Leaves the appointment untouched on error.
    pub fn apply(&mut self, action: &DoctorAction) -> Result<()> {
        if self.status.is_terminal() {
            return Err(ClinicError::conflict(format!(
                "Appointment is already {}",
                self.status.as_str()
            )));
        }

        match action {
            DoctorAction::Approve { mode } => {
                self.status = AppointmentStatus::Approved;
                self.mode = Some(*mode);
            }
            DoctorAction::Reschedule { scheduled_for } => {
                // mode is kept; the doctor re-approves if it needs changing
                self.status = AppointmentStatus::Rescheduled;
                self.scheduled_for = *scheduled_for;
            }
            DoctorAction::Cancel => {
                self.status = AppointmentStatus::Cancelled;
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replace the consultation notes. Returns true when this marks the
    /// appointment completed.
    pub fn record_consultation(&mut self, mut consultation: Consultation) -> bool {
        let now = Utc::now();
        consultation.updated_at = Some(now);
        let completed = consultation.completed;
        self.consultation = Some(consultation);
        if completed {
            self.status = AppointmentStatus::Completed;
        }
        self.updated_at = now;
        completed
    }

    pub fn record_feedback(&mut self, rating: u8, comments: String, reported: bool) {
        let now = Utc::now();
        self.feedback = Some(Feedback {
            rating,
            comments,
            reported,
            created_at: now,
        });
        self.updated_at = now;
    }
}

/// Combine form `date` (YYYY-MM-DD) and `time` (HH:MM, seconds optional)
/// into a UTC timestamp.
pub fn parse_schedule(date: &str, time: &str) -> Result<DateTime<Utc>> {
    let invalid = || ClinicError::validation("Invalid date/time");

    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| invalid())?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| invalid())?;

    Ok(NaiveDateTime::new(date, time).and_utc())
}

/// Validate a feedback rating: an integral value from 1 to 5
pub fn parse_rating(value: f64) -> Result<u8> {
    if value.fract() == 0.0 && (1.0..=5.0).contains(&value) {
        Ok(value as u8)
    } else {
        Err(ClinicError::validation("Rating must be between 1 and 5"))
    }
}
