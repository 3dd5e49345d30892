//! E-Clinic Platform
//!
//! Backend for a small clinic:
//! - Patient signup and cookie sessions
//! - Appointment booking and the doctor review lifecycle
//! - Consultation notes with file attachments
//! - Feedback, in-app notifications and email
//! - Medical records, hospital cards and the medicine inventory
//!
//! ## Module Organization (Aggregate-based)
//!
//! Each aggregate contains:
//! - `entity` - Domain entities
//! - `repository` - Data access
//! - `api` - REST endpoints
//! - `operations` - Use case operations (where applicable)

// Aggregates
pub mod user;
pub mod appointment;
pub mod notification;
pub mod inventory;

// Authentication & administration
pub mod auth;
pub mod admin;

// Side effects: notifications, email, uploads
pub mod dispatch;

// Shared infrastructure
pub mod shared;
pub mod seed;
pub mod app;

pub use shared::error::{ClinicError, Result};

// Re-export main entity types for convenience
pub use user::entity::{BloodGroup, Gender, Genotype, HospitalCard, MedicalRecord, Role, User};
pub use appointment::entity::{Appointment, AppointmentStatus, Consultation, DeliveryMode, DoctorAction, Feedback};
pub use notification::entity::{Notification, NotificationRef, NotificationType};
pub use inventory::entity::Medicine;

// Re-export repositories
pub use user::repository::{MongoUserRepository, UserRepository};
pub use appointment::repository::{AppointmentRepository, MongoAppointmentRepository};
pub use notification::repository::{MongoNotificationRepository, NotificationRepository};
pub use inventory::repository::{MedicineRepository, MongoMedicineRepository};

// Re-export services
pub use auth::{Argon2Config, PasswordService, SessionConfig, SessionService};
pub use dispatch::{
    BlobStore, ClinicEvent, DisabledBlobStore, DispatchPolicy, DispatchReport, EventDispatcher,
    HttpBlobStore, Mailer, NoOpMailer, SmtpMailer,
};
pub use seed::{AdminSeeder, SeedOutcome};
pub use app::{api_router, build_app, Platform};
