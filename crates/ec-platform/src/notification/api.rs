//! Notifications API

use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::notification::entity::{MarkReadTarget, Notification, NotificationRef, NotificationType};
use crate::notification::repository::NotificationRepository;
use crate::shared::api_common::{lenient, ok, ApiResponse, JsonBody};
use crate::shared::error::{ClinicError, Result};
use crate::shared::middleware::Authenticated;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    #[serde(rename = "ref")]
    pub reference: NotificationRef,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<Notification> for NotificationResponse {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            notification_type: n.notification_type,
            title: n.title,
            body: n.body,
            reference: n.reference,
            read: n.read,
            created_at: n.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
    pub unread_count: u64,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadRequest {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default, deserialize_with = "lenient::bool_opt")]
    pub mark_all: Option<bool>,
}

impl MarkReadRequest {
    fn target(self) -> Result<MarkReadTarget> {
        if self.mark_all.unwrap_or(false) {
            return Ok(MarkReadTarget::All);
        }
        let ids: Vec<String> = self
            .ids
            .into_iter()
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .collect();
        if ids.is_empty() {
            return Err(ClinicError::validation("No notifications specified"));
        }
        Ok(MarkReadTarget::Ids(ids))
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MarkReadResponse {
    pub updated: u64,
}

#[derive(Clone)]
pub struct NotificationsState {
    pub notifications: Arc<dyn NotificationRepository>,
}

/// List the caller's notifications, newest first
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "notifications",
    operation_id = "getApiNotifications",
    responses(
        (status = 200, description = "Notifications and unread count", body = NotificationListResponse),
        (status = 401, description = "Not authenticated")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_notifications(
    State(state): State<NotificationsState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<NotificationListResponse>>> {
    let notifications = state.notifications.list_for_recipient(&auth.user_id).await?;
    let unread_count = state.notifications.count_unread(&auth.user_id).await?;

    Ok(ok(NotificationListResponse {
        notifications: notifications.into_iter().map(Into::into).collect(),
        unread_count,
    }))
}

/// Mark notifications read
#[utoipa::path(
    patch,
    path = "/notifications",
    tag = "notifications",
    operation_id = "patchApiNotifications",
    request_body = MarkReadRequest,
    responses(
        (status = 200, description = "Notifications marked read", body = MarkReadResponse),
        (status = 400, description = "No notifications specified")
    ),
    security(("cookie_auth" = []))
)]
pub async fn mark_notifications_read(
    State(state): State<NotificationsState>,
    auth: Authenticated,
    JsonBody(req): JsonBody<MarkReadRequest>,
) -> Result<Json<ApiResponse<MarkReadResponse>>> {
    let target = req.target()?;
    let updated = state.notifications.mark_read(&auth.user_id, &target).await?;

    debug!(user_id = %auth.user_id, updated, "Notifications marked read");

    Ok(ok(MarkReadResponse { updated }))
}

pub fn notifications_router(state: NotificationsState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_notifications, mark_notifications_read))
        .with_state(state)
}
