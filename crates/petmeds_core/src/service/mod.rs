//! Core use-case services.
//!
//! # Responsibility
//! - Combine repositories with external collaborators (identity lookup).
//! - Keep the request layer decoupled from storage details.

pub mod invite_service;
