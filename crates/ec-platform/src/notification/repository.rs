//! Notification Repository

use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{bson::doc, Collection, Database};

use crate::notification::entity::{MarkReadTarget, Notification};
use crate::shared::error::Result;

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: &Notification) -> Result<()>;
    /// Newest first
    async fn list_for_recipient(&self, recipient_id: &str) -> Result<Vec<Notification>>;
    async fn count_unread(&self, recipient_id: &str) -> Result<u64>;
    /// Only touches notifications owned by `recipient_id`. Returns the number changed.
    async fn mark_read(&self, recipient_id: &str, target: &MarkReadTarget) -> Result<u64>;
}

pub struct MongoNotificationRepository {
    collection: Collection<Notification>,
}

impl MongoNotificationRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection("notifications"),
        }
    }
}

#[async_trait]
impl NotificationRepository for MongoNotificationRepository {
    async fn insert(&self, notification: &Notification) -> Result<()> {
        self.collection.insert_one(notification).await?;
        Ok(())
    }

    async fn list_for_recipient(&self, recipient_id: &str) -> Result<Vec<Notification>> {
        let cursor = self.collection
            .find(doc! { "userId": recipient_id })
            .sort(doc! { "createdAt": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_unread(&self, recipient_id: &str) -> Result<u64> {
        Ok(self.collection
            .count_documents(doc! { "userId": recipient_id, "read": false })
            .await?)
    }

    async fn mark_read(&self, recipient_id: &str, target: &MarkReadTarget) -> Result<u64> {
        let filter = match target {
            MarkReadTarget::All => doc! { "userId": recipient_id, "read": false },
            MarkReadTarget::Ids(ids) => doc! {
                "userId": recipient_id,
                "_id": { "$in": ids.clone() },
                "read": false,
            },
        };

        let result = self.collection
            .update_many(filter, doc! { "$set": { "read": true } })
            .await?;
        Ok(result.modified_count)
    }
}
