//! MongoDB Index Initialization
//!
//! Creates indexes for all collections on application startup.

use mongodb::{bson::doc, options::IndexOptions, Database, IndexModel};
use tracing::info;

/// Initialize all MongoDB indexes
pub async fn initialize_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    info!("Initializing MongoDB indexes...");

    create_user_indexes(db).await?;
    create_appointment_indexes(db).await?;
    create_notification_indexes(db).await?;
    create_medicine_indexes(db).await?;

    info!("MongoDB indexes initialized successfully");
    Ok(())
}

fn index(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().background(true).build())
        .build()
}

async fn create_user_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<mongodb::bson::Document>("users");

    // Login key
    collection
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(IndexOptions::builder().unique(true).background(true).build())
                .build(),
        )
        .await?;

    collection.create_index(index(doc! { "role": 1, "name": 1 })).await?;

    Ok(())
}

async fn create_appointment_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<mongodb::bson::Document>("appointments");

    collection.create_index(index(doc! { "userId": 1, "scheduledFor": 1 })).await?;
    collection.create_index(index(doc! { "doctorId": 1, "scheduledFor": 1 })).await?;
    collection.create_index(index(doc! { "scheduledFor": -1 })).await?;

    Ok(())
}

async fn create_notification_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<mongodb::bson::Document>("notifications");

    collection.create_index(index(doc! { "userId": 1, "createdAt": -1 })).await?;
    collection.create_index(index(doc! { "userId": 1, "read": 1 })).await?;

    Ok(())
}

async fn create_medicine_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    let collection = db.collection::<mongodb::bson::Document>("medicines");

    collection.create_index(index(doc! { "name": 1 })).await?;
    collection.create_index(index(doc! { "createdAt": -1 })).await?;

    Ok(())
}
