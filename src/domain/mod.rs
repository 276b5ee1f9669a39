//! Domain module
//!
//! Core domain types and validation shared by the handlers.

pub mod crew;
pub mod error;
pub mod validation;

pub use crew::CrewRole;
pub use error::DomainError;
