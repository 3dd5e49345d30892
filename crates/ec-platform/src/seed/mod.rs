//! Startup Seeding

pub mod admin_seeder;

pub use admin_seeder::{AdminSeeder, SeedOutcome};
