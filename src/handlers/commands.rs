//! Command definitions
//!
//! Commands are validated intentions to change the system state. They are
//! built by the API layer and carry only checked values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::history::{HistoryKey, HistorySubmission, ServiceFields, ServiceHistory};
use crate::service_record::{NewServiceRecord, ServiceRecord};

// =========================================================================
// CreateServiceCommand
// =========================================================================

/// Command to schedule a service and fold it into the crew member's history
#[derive(Debug, Clone, PartialEq)]
pub struct CreateServiceCommand {
    pub key: HistoryKey,
    pub date: NaiveDate,
    pub fields: ServiceFields,
}

impl CreateServiceCommand {
    pub fn new(key: HistoryKey, date: NaiveDate, fields: ServiceFields) -> Self {
        Self { key, date, fields }
    }

    /// Split into the record insert and the history submission
    pub fn into_parts(self) -> (NewServiceRecord, HistorySubmission) {
        let record = NewServiceRecord {
            crew_member_id: self.key.crew_member_id.clone(),
            service_number: self.key.service_number.clone(),
            date: self.date,
            start_time: self.fields.start_time,
            end_time: self.fields.end_time,
            start_location: self.fields.start_location.clone(),
            end_location: self.fields.end_location.clone(),
            vehicle_plate: self.fields.vehicle_plate.clone(),
            assignment: self.fields.assignment.clone(),
        };
        let submission = HistorySubmission {
            key: self.key,
            fields: self.fields,
        };
        (record, submission)
    }
}

/// Result of a successful service creation
#[derive(Debug, Clone)]
pub struct CreateServiceResult {
    pub record: ServiceRecord,
    pub history: ServiceHistory,
}

// =========================================================================
// RecordPositionCommand
// =========================================================================

/// Command to publish a crew member's current GPS position
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPositionCommand {
    pub crew_member_id: String,
    pub vehicle_id: String,
    pub route_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: Option<f64>,
    pub speed: Option<f64>,
}

// =========================================================================
// CheckInCommand
// =========================================================================

/// Default check-in type: a hand-off between crews
pub const DEFAULT_CHECKIN_KIND: &str = "Rendição";

/// Command to record a crew member's arrival at a hand-off point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckInCommand {
    pub crew_member_id: String,
    pub location: String,
    pub service_id: Option<i64>,
    pub vehicle_id: Option<String>,
    pub route_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub kind: String,
}

impl CheckInCommand {
    pub fn new(crew_member_id: String, location: String) -> Self {
        Self {
            crew_member_id,
            location,
            service_id: None,
            vehicle_id: None,
            route_id: None,
            latitude: None,
            longitude: None,
            kind: DEFAULT_CHECKIN_KIND.to_string(),
        }
    }

    pub fn with_kind(mut self, kind: String) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_service(mut self, service_id: i64) -> Self {
        self.service_id = Some(service_id);
        self
    }

    pub fn with_vehicle(mut self, vehicle_id: String) -> Self {
        self.vehicle_id = Some(vehicle_id);
        self
    }

    pub fn with_route(mut self, route_id: String) -> Self {
        self.route_id = Some(route_id);
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }

    /// Observation message posted on the route when the crew member arrives
    pub fn arrival_message(&self) -> String {
        format!("Cheguei ao {}", self.location)
    }
}
