//! Authentication
//!
//! Session tokens, password hashing and the login/signup endpoints.

pub mod session_service;
pub mod password_service;
pub mod auth_api;

pub use session_service::{SessionClaims, SessionConfig, SessionService};
pub use password_service::{Argon2Config, PasswordService};
pub use auth_api::{auth_router, AuthState};
