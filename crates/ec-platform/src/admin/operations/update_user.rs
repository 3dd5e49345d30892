//! Update User Use Case
//!
//! Admin edits of role and profile fields.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::shared::error::{ClinicError, Result};
use crate::user::entity::{Role, User};
use crate::user::repository::UserRepository;

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserCommand {
    #[serde(skip)]
    pub user_id: String,
    /// admin | doctor | user
    pub role: Option<String>,
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub primary_speciality: Option<String>,
}

impl UpdateUserCommand {
    fn is_empty(&self) -> bool {
        self.role.is_none() && self.name.is_none() && self.contact_number.is_none() && self.primary_speciality.is_none()
    }
}

pub struct UpdateUserUseCase {
    users: Arc<dyn UserRepository>,
}

impl UpdateUserUseCase {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }

    pub async fn execute(&self, command: UpdateUserCommand) -> Result<User> {
        if command.is_empty() {
            return Err(ClinicError::validation("No valid fields"));
        }

        let role = command
            .role
            .as_deref()
            .map(|r| Role::parse(r).ok_or_else(|| ClinicError::validation("Invalid role")))
            .transpose()?;

        let mut user = self
            .users
            .find_by_id(&command.user_id)
            .await?
            .ok_or_else(|| ClinicError::not_found("User", &command.user_id))?;

        if let Some(role) = role {
            user.role = role;
        }
        if let Some(name) = command.name {
            user.name = name.trim().to_string();
        }
        if let Some(contact_number) = command.contact_number {
            user.contact_number = contact_number.trim().to_string();
        }
        if let Some(speciality) = command.primary_speciality {
            let speciality = speciality.trim();
            user.primary_speciality = (!speciality.is_empty()).then(|| speciality.to_string());
        }
        user.updated_at = Utc::now();

        self.users.update_profile(&user).await?;

        info!(user_id = %user.id, role = %user.role, "User updated by admin");
        Ok(user)
    }
}
