//! User Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::bson::{doc, DateTime as BsonDateTime, Document};
use mongodb::{Collection, Database};

use crate::shared::error::{ClinicError, Result};
use crate::user::entity::{MedicalRecord, Role, User};

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered
    async fn insert(&self, user: &User) -> Result<()>;
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;
    /// `email` must already be normalized
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>>;
    /// Only matches users whose role is doctor
    async fn find_doctor(&self, id: &str) -> Result<Option<User>>;
    /// Sorted by name
    async fn find_by_role(&self, role: Role) -> Result<Vec<User>>;
    /// Newest first
    async fn find_all(&self) -> Result<Vec<User>>;
    /// Writes role, name, contact number and speciality
    async fn update_profile(&self, user: &User) -> Result<()>;
    /// Writes blood group and genotype when set
    async fn update_vitals(&self, user: &User) -> Result<()>;
    async fn push_medical_record(&self, user_id: &str, record: &MedicalRecord) -> Result<()>;
    async fn save_hospital_card(&self, user: &User) -> Result<()>;
    /// Returns false when nothing was deleted
    async fn delete(&self, id: &str) -> Result<bool>;
}

fn profile_update(user: &User) -> Document {
    let mut set = doc! {
        "role": user.role.as_str(),
        "name": &user.name,
        "contactNumber": &user.contact_number,
        "updatedAt": BsonDateTime::from_chrono(user.updated_at),
    };
    let mut update = Document::new();
    match &user.primary_speciality {
        Some(speciality) => {
            set.insert("primarySpeciality", speciality);
        }
        None => {
            update.insert("$unset", doc! { "primarySpeciality": "" });
        }
    }
    update.insert("$set", set);
    update
}

fn vitals_fields(user: &User) -> Result<Document> {
    let mut fields = doc! { "updatedAt": BsonDateTime::from_chrono(user.updated_at) };
    if let Some(blood_group) = &user.blood_group {
        fields.insert("bloodGroup", bson::to_bson(blood_group)?);
    }
    if let Some(genotype) = &user.genotype {
        fields.insert("genotype", bson::to_bson(genotype)?);
    }
    Ok(fields)
}

pub struct MongoUserRepository {
    collection: Collection<User>,
}

impl MongoUserRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("users"),
        }
    }
}

#[async_trait]
impl UserRepository for MongoUserRepository {
    async fn insert(&self, user: &User) -> Result<()> {
        match self.collection.insert_one(user).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let err = ClinicError::from(e);
                if err.is_duplicate_key() {
                    Err(ClinicError::conflict("User already exists"))
                } else {
                    Err(err)
                }
            }
        }
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id }).await?)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "email": email }).await?)
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<User>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self.collection.find(doc! { "_id": { "$in": ids.to_vec() } }).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_doctor(&self, id: &str) -> Result<Option<User>> {
        Ok(self.collection.find_one(doc! { "_id": id, "role": "doctor" }).await?)
    }

    async fn find_by_role(&self, role: Role) -> Result<Vec<User>> {
        let cursor = self.collection
            .find(doc! { "role": role.as_str() })
            .sort(doc! { "name": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn find_all(&self) -> Result<Vec<User>> {
        let cursor = self.collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn update_profile(&self, user: &User) -> Result<()> {
        self.collection.update_one(doc! { "_id": &user.id }, profile_update(user)).await?;
        Ok(())
    }

    async fn update_vitals(&self, user: &User) -> Result<()> {
        self.collection
            .update_one(doc! { "_id": &user.id }, doc! { "$set": vitals_fields(user)? })
            .await?;
        Ok(())
    }

    async fn push_medical_record(&self, user_id: &str, record: &MedicalRecord) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": user_id },
                doc! {
                    "$push": { "medicalRecords": bson::to_bson(record)? },
                    "$set": { "updatedAt": BsonDateTime::now() },
                },
            )
            .await?;
        Ok(())
    }

    async fn save_hospital_card(&self, user: &User) -> Result<()> {
        self.collection
            .update_one(
                doc! { "_id": &user.id },
                doc! {
                    "$set": {
                        "hospitalCard": bson::to_bson(&user.hospital_card)?,
                        "updatedAt": BsonDateTime::from_chrono(user.updated_at),
                    }
                },
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = self.collection.delete_one(doc! { "_id": id }).await?;
        Ok(result.deleted_count > 0)
    }
}
