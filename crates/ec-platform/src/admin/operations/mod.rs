//! Admin Operations

pub mod provision_doctor;
pub mod update_user;

pub use provision_doctor::{ProvisionDoctorCommand, ProvisionDoctorUseCase};
pub use update_user::{UpdateUserCommand, UpdateUserUseCase};
