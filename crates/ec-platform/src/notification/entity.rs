//! Notification Entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::shared::ids::new_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum NotificationType {
    Appointment,
    Message,
    #[default]
    System,
}

/// What a notification points at
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub appointment_id: Option<String>,
    /// The other party of the event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

impl NotificationRef {
    pub fn appointment(appointment_id: impl Into<String>) -> Self {
        Self {
            appointment_id: Some(appointment_id.into()),
            user_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type", default)]
    pub notification_type: NotificationType,
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[serde(default, rename = "ref")]
    pub reference: NotificationRef,
    #[serde(default)]
    pub read: bool,
    #[serde(with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        recipient_id: impl Into<String>,
        notification_type: NotificationType,
        title: impl Into<String>,
        body: impl Into<String>,
        reference: NotificationRef,
    ) -> Self {
        Self {
            id: new_id(),
            user_id: recipient_id.into(),
            notification_type,
            title: title.into(),
            body: body.into(),
            reference,
            read: false,
            created_at: Utc::now(),
        }
    }
}

/// Which notifications to mark read
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkReadTarget {
    All,
    Ids(Vec<String>),
}
