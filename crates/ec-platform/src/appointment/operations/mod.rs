//! Appointment Operations
//!
//! Lifecycle use cases. Each returns the event describing what happened;
//! side effects are left to the dispatcher.

pub mod events;
pub mod book;
pub mod act;
pub mod consultation;
pub mod feedback;

pub use events::*;
pub use book::{BookAppointmentCommand, BookAppointmentUseCase};
pub use act::{DoctorActionCommand, DoctorActionUseCase};
pub use consultation::{ConsultationRecorded, SubmitConsultationCommand, SubmitConsultationUseCase, UploadedFile};
pub use feedback::{SubmitFeedbackCommand, SubmitFeedbackUseCase};
