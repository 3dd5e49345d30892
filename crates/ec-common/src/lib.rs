//! E-Clinic Common
//!
//! Utilities shared by the E-Clinic binaries.

pub mod logging;

pub use logging::{init_logging, LogFormat};
