//! CRM REST adapter

pub mod client;

pub use client::HttpCrmClient;
