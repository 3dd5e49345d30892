//! Event Dispatch
//!
//! Side effects of domain events, plus the outbound integrations they use.

pub mod events;
pub mod dispatcher;
pub mod mailer;
pub mod blob;

pub use events::{ClinicEvent, DoctorProvisioned, PatientRegistered, Secret};
pub use dispatcher::{DispatchPolicy, DispatchReport, EventDispatcher};
pub use mailer::{EmailMessage, MailError, Mailer, NoOpMailer, SmtpMailer};
pub use blob::{BlobStore, DisabledBlobStore, HttpBlobStore};
