//! # Clinic Shared
//!
//! Configuration, telemetry and small helpers shared by the clinic crates.

pub mod constants;
pub mod utils;
pub mod telemetry;
pub mod config;
pub mod error;

pub use error::AppError;
