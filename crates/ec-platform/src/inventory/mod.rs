//! Inventory Aggregate
//!
//! Medicine stock records.

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::Medicine;
pub use repository::{MedicineRepository, MongoMedicineRepository};
pub use api::{inventory_router, InventoryState};
