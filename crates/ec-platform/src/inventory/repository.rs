//! Medicine Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::inventory::entity::Medicine;
use crate::shared::error::Result;

#[async_trait]
pub trait MedicineRepository: Send + Sync {
    async fn insert(&self, medicine: &Medicine) -> Result<()>;
    /// Newest first
    async fn list_recent(&self) -> Result<Vec<Medicine>>;
    /// Alphabetical
    async fn list_by_name(&self) -> Result<Vec<Medicine>>;
}

pub struct MongoMedicineRepository {
    collection: Collection<Medicine>,
}

impl MongoMedicineRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("medicines"),
        }
    }
}

#[async_trait]
impl MedicineRepository for MongoMedicineRepository {
    async fn insert(&self, medicine: &Medicine) -> Result<()> {
        self.collection.insert_one(medicine).await?;
        Ok(())
    }

    async fn list_recent(&self) -> Result<Vec<Medicine>> {
        let cursor = self.collection
            .find(doc! {})
            .sort(doc! { "createdAt": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn list_by_name(&self) -> Result<Vec<Medicine>> {
        let cursor = self.collection
            .find(doc! {})
            .sort(doc! { "name": 1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }
}
