//! Admin Account Seeder
//!
//! Creates the first admin account on startup when one is configured.
//! Running it again never touches an existing account.

use std::sync::Arc;

use ec_config::SeedConfig;
use tracing::{info, warn};

use crate::auth::password_service::PasswordService;
use crate::shared::error::Result;
use crate::user::entity::{normalize_email, Role, User};
use crate::user::repository::UserRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    /// No admin email configured
    Skipped,
    Created { user_id: String },
    AlreadyExists,
}

pub struct AdminSeeder {
    users: Arc<dyn UserRepository>,
    passwords: Arc<PasswordService>,
}

impl AdminSeeder {
    pub fn new(users: Arc<dyn UserRepository>, passwords: Arc<PasswordService>) -> Self {
        Self { users, passwords }
    }

    pub async fn seed(&self, config: &SeedConfig) -> Result<SeedOutcome> {
        let email = normalize_email(&config.admin_email);
        if email.is_empty() {
            return Ok(SeedOutcome::Skipped);
        }

        if self.users.find_by_email(&email).await?.is_some() {
            info!(email = %email, "Admin account already exists");
            return Ok(SeedOutcome::AlreadyExists);
        }

        if config.admin_password.is_empty() {
            warn!(email = %email, "Admin email configured without a password, not seeding");
            return Ok(SeedOutcome::Skipped);
        }
        PasswordService::check_policy(&config.admin_password)?;

        let hash = self.passwords.hash_password(&config.admin_password)?;
        let admin = User::new(&email, hash, Role::Admin).with_name(config.admin_name.trim());
        self.users.insert(&admin).await?;

        info!(user_id = %admin.id, email = %admin.email, "Seeded admin account");
        Ok(SeedOutcome::Created { user_id: admin.id })
    }
}
