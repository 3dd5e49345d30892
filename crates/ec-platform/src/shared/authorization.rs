//! Authorization
//!
//! Role checks against the verified session of a request.

use crate::auth::session_service::SessionClaims;
use crate::shared::error::{ClinicError, Result};
use crate::user::entity::Role;

/// Authorization context for a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthContext {
    pub user_id: String,
    pub role: Role,
    pub email: String,
}

impl AuthContext {
    pub fn from_claims(claims: SessionClaims) -> Self {
        Self {
            user_id: claims.sub,
            role: claims.role,
            email: claims.email,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(Role::Admin)
    }

    fn require(&self, role: Role) -> Result<()> {
        if self.has_role(role) {
            Ok(())
        } else {
            Err(ClinicError::forbidden("Forbidden"))
        }
    }

    pub fn require_admin(&self) -> Result<()> {
        self.require(Role::Admin)
    }

    pub fn require_doctor(&self) -> Result<()> {
        self.require(Role::Doctor)
    }

    /// Patient routes are for role `user` only
    pub fn require_patient(&self) -> Result<()> {
        self.require(Role::User)
    }
}
