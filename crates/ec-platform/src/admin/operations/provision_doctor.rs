//! Provision Doctor Use Case
//!
//! Admins create doctor accounts with a generated temporary password.

use std::sync::{Arc, OnceLock};

use regex::Regex;
use serde::Deserialize;
use tracing::info;
use utoipa::ToSchema;

use crate::auth::password_service::{generate_temp_password, PasswordService};
use crate::dispatch::events::{DoctorProvisioned, Secret};
use crate::shared::api_common::non_empty;
use crate::shared::error::{ClinicError, Result};
use crate::user::entity::{normalize_email, Role, User};
use crate::user::repository::UserRepository;

fn is_valid_email(email: &str) -> bool {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|p| p.is_match(email))
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProvisionDoctorCommand {
    pub email: Option<String>,
    pub name: Option<String>,
    pub contact_number: Option<String>,
    pub primary_speciality: Option<String>,
}

pub struct ProvisionDoctorUseCase {
    users: Arc<dyn UserRepository>,
    passwords: Arc<PasswordService>,
}

impl ProvisionDoctorUseCase {
    pub fn new(users: Arc<dyn UserRepository>, passwords: Arc<PasswordService>) -> Self {
        Self { users, passwords }
    }

    pub async fn execute(&self, command: ProvisionDoctorCommand) -> Result<DoctorProvisioned> {
        let email = non_empty(command.email)
            .map(|e| normalize_email(&e))
            .ok_or_else(|| ClinicError::validation("Email is required"))?;
        if !is_valid_email(&email) {
            return Err(ClinicError::validation("Invalid email"));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(ClinicError::conflict("User already exists"));
        }

        let temporary_password = generate_temp_password();
        let hash = self.passwords.hash_password(&temporary_password)?;

        let mut doctor = User::new(&email, hash, Role::Doctor)
            .with_name(non_empty(command.name).unwrap_or_default())
            .with_contact_number(non_empty(command.contact_number).unwrap_or_default());
        doctor.primary_speciality = non_empty(command.primary_speciality);

        self.users.insert(&doctor).await?;

        info!(user_id = %doctor.id, email = %doctor.email, "Doctor account provisioned");

        Ok(DoctorProvisioned {
            user_id: doctor.id,
            email: doctor.email,
            name: doctor.name,
            temporary_password: Secret::new(temporary_password),
        })
    }
}
