//! Core domain types shared across services.

pub mod errors;
pub mod models;
