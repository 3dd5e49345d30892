//! User Aggregate
//!
//! Patients, doctors and admins.

pub mod entity;
pub mod repository;
pub mod api;

pub use entity::{Role, User};
pub use repository::{MongoUserRepository, UserRepository};
pub use api::{users_router, UserResponse, UsersState};
