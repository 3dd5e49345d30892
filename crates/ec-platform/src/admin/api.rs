//! Admin API
//!
//! User management and doctor provisioning.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

use crate::admin::operations::{
    ProvisionDoctorCommand, ProvisionDoctorUseCase, UpdateUserCommand, UpdateUserUseCase,
};
use crate::auth::password_service::PasswordService;
use crate::dispatch::dispatcher::EventDispatcher;
use crate::shared::api_common::{ok, Ack, ApiResponse, JsonBody};
use crate::shared::error::{ClinicError, Result};
use crate::shared::ids::is_valid_id;
use crate::shared::middleware::Authenticated;
use crate::user::api::UserResponse;
use crate::user::repository::UserRepository;

#[derive(Debug, Serialize, ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserUpdatedResponse {
    pub user: UserResponse,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorCreatedResponse {
    pub user_id: String,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Only returned when the email was not sent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_password: Option<String>,
}

#[derive(Clone)]
pub struct AdminState {
    pub users: Arc<dyn UserRepository>,
    pub passwords: Arc<PasswordService>,
    pub dispatcher: Arc<EventDispatcher>,
}

/// All users, newest first
#[utoipa::path(
    get,
    path = "/admin/users",
    tag = "admin",
    operation_id = "getApiAdminUsers",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 403, description = "Not an admin")
    ),
    security(("cookie_auth" = []))
)]
pub async fn list_users(
    State(state): State<AdminState>,
    auth: Authenticated,
) -> Result<Json<ApiResponse<UserListResponse>>> {
    auth.require_admin()?;

    let users = state.users.find_all().await?;
    Ok(ok(UserListResponse {
        users: users.into_iter().map(Into::into).collect(),
    }))
}

/// Change a user's role or profile fields
#[utoipa::path(
    patch,
    path = "/admin/users/{id}",
    tag = "admin",
    operation_id = "patchApiAdminUsersById",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    request_body = UpdateUserCommand,
    responses(
        (status = 200, description = "User updated", body = UserUpdatedResponse),
        (status = 400, description = "No valid fields or invalid role"),
        (status = 404, description = "User not found")
    ),
    security(("cookie_auth" = []))
)]
pub async fn update_user(
    State(state): State<AdminState>,
    auth: Authenticated,
    Path(id): Path<String>,
    JsonBody(mut command): JsonBody<UpdateUserCommand>,
) -> Result<Json<ApiResponse<UserUpdatedResponse>>> {
    auth.require_admin()?;
    command.user_id = id;

    let user = UpdateUserUseCase::new(state.users.clone()).execute(command).await?;
    Ok(ok(UserUpdatedResponse { user: user.into() }))
}

/// Delete a user
#[utoipa::path(
    delete,
    path = "/admin/users/{id}",
    tag = "admin",
    operation_id = "deleteApiAdminUsersById",
    params(
        ("id" = String, Path, description = "User ID")
    ),
    responses(
        (status = 200, description = "User deleted", body = Ack),
        (status = 404, description = "User not found")
    ),
    security(("cookie_auth" = []))
)]
pub async fn delete_user(
    State(state): State<AdminState>,
    auth: Authenticated,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Ack>>> {
    auth.require_admin()?;

    if !is_valid_id(&id) || !state.users.delete(&id).await? {
        return Err(ClinicError::not_found("User", &id));
    }

    info!(user_id = %id, admin_id = %auth.user_id, "User deleted");
    Ok(ok(Ack::default()))
}

/// Create a doctor account and email its temporary password
#[utoipa::path(
    post,
    path = "/admin/doctors",
    tag = "admin",
    operation_id = "postApiAdminDoctors",
    request_body = ProvisionDoctorCommand,
    responses(
        (status = 200, description = "Doctor created", body = DoctorCreatedResponse),
        (status = 400, description = "Missing or invalid email"),
        (status = 409, description = "User already exists")
    ),
    security(("cookie_auth" = []))
)]
pub async fn create_doctor(
    State(state): State<AdminState>,
    auth: Authenticated,
    JsonBody(command): JsonBody<ProvisionDoctorCommand>,
) -> Result<Json<ApiResponse<DoctorCreatedResponse>>> {
    auth.require_admin()?;

    let use_case = ProvisionDoctorUseCase::new(state.users.clone(), state.passwords.clone());
    let event = use_case.execute(command).await?;
    let user_id = event.user_id.clone();

    let report = state.dispatcher.dispatch(&event.clone().into()).await;
    let (message, temporary_password) = if report.email_sent {
        (None, None)
    } else {
        warn!(user_id = %user_id, "Temporary password was not emailed");
        (
            Some("Email could not be sent. Deliver the temporary password to the doctor manually.".to_string()),
            Some(event.temporary_password.expose().to_string()),
        )
    };

    Ok(ok(DoctorCreatedResponse {
        user_id,
        email_sent: report.email_sent,
        message,
        temporary_password,
    }))
}

pub fn admin_router(state: AdminState) -> OpenApiRouter {
    OpenApiRouter::new()
        .routes(routes!(list_users))
        .routes(routes!(update_user, delete_user))
        .routes(routes!(create_doctor))
        .with_state(state)
}
