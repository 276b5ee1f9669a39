//! Command Handlers module
//!
//! Handlers that orchestrate the write paths of the API.
//! Each handler coordinates validation results, stores and logging.

mod checkin_handler;
mod commands;
mod gps_handler;
mod service_handler;


pub use checkin_handler::{CheckIn, CheckInHandler, CHECKIN_OBSERVATION_KIND};
pub use commands::*;
pub use gps_handler::{GpsPosition, RecordPositionHandler};
pub use service_handler::{AutoFillHandler, CreateServiceHandler};
