//! Notification Aggregate
//!
//! In-app notifications for patients and doctors.

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{MarkReadTarget, Notification, NotificationRef, NotificationType};
pub use repository::{MongoNotificationRepository, NotificationRepository};
pub use api::{notifications_router, NotificationsState};
