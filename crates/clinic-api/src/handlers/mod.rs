//! HTTP handlers

pub mod admin;
pub mod auth;
pub mod clinic;
pub mod health;
pub mod registration;
pub mod subscription;
pub mod webhooks;
