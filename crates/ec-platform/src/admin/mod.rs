//! Admin Management
//!
//! User administration and doctor provisioning.

pub mod api;
pub mod operations;

pub use api::{admin_router, AdminState};
