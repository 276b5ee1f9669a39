//! Guarda-Freios Library
//!
//! Backend for tram crews: service scheduling with history-based auto-fill,
//! live GPS sharing, check-ins, route notices and vehicle fault reports.
//! Re-exports modules for the server binary and integration tests.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod handlers;
pub mod history;
pub mod jobs;
pub mod service_record;
pub mod storage;

pub use config::Config;
pub use domain::{CrewRole, DomainError};
pub use error::{AppError, AppResult};
