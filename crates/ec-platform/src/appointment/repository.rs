//! Appointment Repository
//!
//! Lookups that mutate are always scoped by owner: the patient for
//! feedback, the doctor for actions and consultations.

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::{Collection, Database};

use crate::appointment::entity::Appointment;
use crate::shared::error::Result;

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    async fn insert(&self, appointment: &Appointment) -> Result<()>;
    async fn find_for_patient(&self, id: &str, patient_id: &str) -> Result<Option<Appointment>>;
    async fn find_for_doctor(&self, id: &str, doctor_id: &str) -> Result<Option<Appointment>>;
    /// Sorted by scheduled time, earliest first
    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>>;
    /// Sorted by scheduled time, earliest first
    async fn list_by_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>>;
    /// Sorted by scheduled time, latest first
    async fn list_all(&self) -> Result<Vec<Appointment>>;
    async fn has_link(&self, doctor_id: &str, patient_id: &str) -> Result<bool>;
    /// Writes status, mode and scheduled time after a doctor action
    async fn save_decision(&self, appointment: &Appointment) -> Result<()>;
    /// Writes the consultation and status
    async fn save_consultation(&self, appointment: &Appointment) -> Result<()>;
    /// Writes the feedback only
    async fn save_feedback(&self, appointment: &Appointment) -> Result<()>;
}

fn decision_fields(appointment: &Appointment) -> Document {
    let mut fields = doc! {
        "status": appointment.status.as_str(),
        "scheduledFor": BsonDateTime::from_chrono(appointment.scheduled_for),
        "updatedAt": BsonDateTime::from_chrono(appointment.updated_at),
    };
    if let Some(mode) = appointment.mode {
        fields.insert("mode", mode.as_str());
    }
    fields
}

fn consultation_fields(appointment: &Appointment) -> Result<Document> {
    Ok(doc! {
        "consultation": bson::to_bson(&appointment.consultation)?,
        "status": appointment.status.as_str(),
        "updatedAt": BsonDateTime::from_chrono(appointment.updated_at),
    })
}

fn feedback_fields(appointment: &Appointment) -> Result<Document> {
    Ok(doc! {
        "feedback": bson::to_bson(&appointment.feedback)?,
        "updatedAt": BsonDateTime::from_chrono(appointment.updated_at),
    })
}

pub struct MongoAppointmentRepository {
    collection: Collection<Appointment>,
}

impl MongoAppointmentRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("appointments"),
        }
    }
}

#[async_trait]
impl AppointmentRepository for MongoAppointmentRepository {
    async fn insert(&self, appointment: &Appointment) -> Result<()> {
        self.collection.insert_one(appointment).await?;
        Ok(())
    }

    async fn find_for_patient(&self, id: &str, patient_id: &str) -> Result<Option<Appointment>> {
        Ok(self.collection.find_one(doc! { "_id": id, "userId": patient_id }).await?)
    }

    async fn find_for_doctor(&self, id: &str, doctor_id: &str) -> Result<Option<Appointment>> {
        Ok(self.collection.find_one(doc! { "_id": id, "doctorId": doctor_id }).await?)
    }

    async fn list_by_patient(&self, patient_id: &str) -> Result<Vec<Appointment>> {
        let cursor = self.collection
            .find(doc! { "userId": patient_id })
            .sort(doc! { "scheduledFor": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_by_doctor(&self, doctor_id: &str) -> Result<Vec<Appointment>> {
        let cursor = self.collection
            .find(doc! { "doctorId": doctor_id })
            .sort(doc! { "scheduledFor": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_all(&self) -> Result<Vec<Appointment>> {
        let cursor = self.collection
            .find(doc! {})
            .sort(doc! { "scheduledFor": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn has_link(&self, doctor_id: &str, patient_id: &str) -> Result<bool> {
        let found = self.collection
            .find_one(doc! { "doctorId": doctor_id, "userId": patient_id })
            .await?;
        Ok(found.is_some())
    }

    async fn save_decision(&self, appointment: &Appointment) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": &appointment.id, "doctorId": &appointment.doctor_id },
                doc! { "$set": decision_fields(appointment) },
            )
            .await?;
        Ok(())
    }

    async fn save_consultation(&self, appointment: &Appointment) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": &appointment.id, "doctorId": &appointment.doctor_id },
                doc! { "$set": consultation_fields(appointment)? },
            )
            .await?;
        Ok(())
    }

    async fn save_feedback(&self, appointment: &Appointment) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": &appointment.id, "userId": &appointment.user_id },
                doc! { "$set": feedback_fields(appointment)? },
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::appointment::entity::{Consultation, DeliveryMode, DoctorAction};
    use chrono::{TimeZone, Utc};

    fn booked() -> Appointment {
        Appointment::book("P1", "D1", Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap(), "")
    }

    fn keys(fields: &Document) -> Vec<&str> {
        let mut keys: Vec<&str> = fields.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_feedback_update_leaves_status_and_consultation_alone() {
        let mut appt = booked();
        appt.record_feedback(4, "Helpful".into(), false);

        let fields = feedback_fields(&appt).unwrap();
        assert_eq!(keys(&fields), vec!["feedback", "updatedAt"]);
        assert_eq!(fields.get_document("feedback").unwrap().get_i32("rating").unwrap(), 4);
    }

    #[test]
    fn test_consultation_update_sets_status() {
        let mut appt = booked();
        appt.record_consultation(Consultation {
            diagnosis: "Flu".into(),
            completed: true,
            ..Default::default()
        });

        let fields = consultation_fields(&appt).unwrap();
        assert_eq!(keys(&fields), vec!["consultation", "status", "updatedAt"]);
        assert_eq!(fields.get_str("status").unwrap(), "completed");
        assert_eq!(
            fields.get_document("consultation").unwrap().get_str("diagnosis").unwrap(),
            "Flu"
        );
    }

    #[test]
    fn test_decision_update_only_sets_mode_once_known() {
        let mut appt = booked();
        appt.apply(&DoctorAction::Cancel).unwrap();
        let fields = decision_fields(&appt);
        assert_eq!(keys(&fields), vec!["scheduledFor", "status", "updatedAt"]);

        let mut appt = booked();
        appt.apply(&DoctorAction::Approve { mode: DeliveryMode::Online }).unwrap();
        let fields = decision_fields(&appt);
        assert_eq!(fields.get_str("mode").unwrap(), "online");
        assert!(!fields.contains_key("feedback"));
        assert!(!fields.contains_key("consultation"));
    }
}
