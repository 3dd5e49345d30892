//! User Entity
//!
//! Patients, doctors and admins share one collection, distinguished by role.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::ids::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Doctor,
    /// A patient
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "doctor" => Some(Role::Doctor),
            "user" => Some(Role::User),
            _ => None,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "male" => Some(Gender::Male),
            "female" => Some(Gender::Female),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

impl BloodGroup {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "A+" => Some(BloodGroup::APos),
            "A-" => Some(BloodGroup::ANeg),
            "B+" => Some(BloodGroup::BPos),
            "B-" => Some(BloodGroup::BNeg),
            "AB+" => Some(BloodGroup::AbPos),
            "AB-" => Some(BloodGroup::AbNeg),
            "O+" => Some(BloodGroup::OPos),
            "O-" => Some(BloodGroup::ONeg),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum Genotype {
    #[serde(rename = "AA")]
    Aa,
    #[serde(rename = "AS")]
    As,
    #[serde(rename = "SS")]
    Ss,
    #[serde(rename = "AC")]
    Ac,
    #[serde(rename = "SC")]
    Sc,
    #[serde(rename = "CC")]
    Cc,
}

impl Genotype {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AA" => Some(Genotype::Aa),
            "AS" => Some(Genotype::As),
            "SS" => Some(Genotype::Ss),
            "AC" => Some(Genotype::Ac),
            "SC" => Some(Genotype::Sc),
            "CC" => Some(Genotype::Cc),
            _ => None,
        }
    }
}

/// Free-form entry in a patient's medical history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalRecord {
    pub record_type: String,
    #[serde(default)]
    pub notes: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalCard {
    pub address: String,
    pub image_url: String,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,

    /// Lowercased, unique login key
    pub email: String,

    pub password_hash: String,

    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub contact_number: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_speciality: Option<String>,

    /// Stored as a `YYYY-MM-DD` string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<Gender>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<BloodGroup>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub genotype: Option<Genotype>,

    #[serde(default)]
    pub medical_records: Vec<MedicalRecord>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hospital_card: Option<HospitalCard>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: &str, password_hash: impl Into<String>, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: new_id(),
            email: normalize_email(email),
            password_hash: password_hash.into(),
            role,
            name: String::new(),
            contact_number: String::new(),
            primary_speciality: None,
            date_of_birth: None,
            gender: None,
            blood_group: None,
            genotype: None,
            medical_records: Vec::new(),
            hospital_card: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_contact_number(mut self, contact_number: impl Into<String>) -> Self {
        self.contact_number = contact_number.into();
        self
    }

    pub fn with_speciality(mut self, speciality: impl Into<String>) -> Self {
        self.primary_speciality = Some(speciality.into());
        self
    }

    pub fn display_name(&self) -> Option<&str> {
        let name = self.name.trim();
        (!name.is_empty()).then_some(name)
    }

    /// Appends the entry and returns a copy for persisting
    pub fn add_medical_record(&mut self, record_type: String, notes: String, recorded_at: DateTime<Utc>) -> MedicalRecord {
        let record = MedicalRecord {
            record_type,
            notes,
            recorded_at,
        };
        self.medical_records.push(record.clone());
        self.updated_at = Utc::now();
        record
    }

    pub fn issue_card(&mut self, address: String, image_url: String) {
        self.hospital_card = Some(HospitalCard {
            address,
            image_url,
            issued_at: Utc::now(),
        });
        self.updated_at = Utc::now();
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Build a date of birth from separate form fields; `None` if any part is
/// missing or the date does not exist.
pub fn date_of_birth(year: Option<&str>, month: Option<&str>, day: Option<&str>) -> Option<NaiveDate> {
    let year = year?.trim().parse().ok()?;
    let month = month?.trim().parse().ok()?;
    let day = day?.trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_normalizes_email() {
        let user = User::new("  Jane.Doe@Example.COM ", "hash", Role::User);
        assert_eq!(user.email, "jane.doe@example.com");
        assert_eq!(user.id.len(), 13);
        assert!(user.medical_records.is_empty());
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Doctor).unwrap(), "\"doctor\"");
        assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
        assert_eq!(Role::parse("nurse"), None);
    }

    #[test]
    fn test_blood_group_and_genotype_labels() {
        assert_eq!(serde_json::to_string(&BloodGroup::AbNeg).unwrap(), "\"AB-\"");
        let g: Genotype = serde_json::from_str("\"SS\"").unwrap();
        assert_eq!(g, Genotype::Ss);
        assert!(serde_json::from_str::<BloodGroup>("\"C+\"").is_err());
        assert_eq!(BloodGroup::parse(" ab- "), Some(BloodGroup::AbNeg));
        assert_eq!(Genotype::parse("as"), Some(Genotype::As));
        assert_eq!(Gender::parse("Female"), Some(Gender::Female));
        assert_eq!(Gender::parse("other"), None);
    }

    #[test]
    fn test_date_of_birth() {
        assert_eq!(
            date_of_birth(Some("1990"), Some("2"), Some("28")),
            NaiveDate::from_ymd_opt(1990, 2, 28)
        );
        assert_eq!(date_of_birth(Some("1990"), Some("2"), Some("30")), None);
        assert_eq!(date_of_birth(Some("1990"), None, Some("1")), None);
    }

    #[test]
    fn test_bson_round_trip_keeps_id_field() {
        let user = User::new("a@b.c", "hash", Role::Doctor).with_speciality("Cardiology");
        let doc = bson::to_document(&user).unwrap();
        assert!(doc.contains_key("_id"));
        assert_eq!(doc.get_str("role").unwrap(), "doctor");
        assert_eq!(doc.get_str("primarySpeciality").unwrap(), "Cardiology");
    }
}
