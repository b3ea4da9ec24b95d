//! # Clinic Security
//!
//! Security utilities: password hashing, session tokens, webhook secrets.

pub mod jwt;
pub mod password;
pub mod webhook_auth;

pub use jwt::{JwtService, SessionClaims};
pub use password::PasswordService;
