//! Shared Module
//!
//! Cross-cutting concerns and shared utilities.

pub mod error;
pub mod ids;
pub mod middleware;
pub mod authorization;
pub mod api_common;
pub mod indexes;
pub mod health_api;

pub use error::{ClinicError, Result};
pub use middleware::{AppState, AuthLayer, Authenticated};
pub use authorization::AuthContext;
pub use health_api::health_router;
