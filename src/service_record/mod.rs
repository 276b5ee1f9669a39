//! Service records
//!
//! A service record is one scheduled shift of a crew member. Records are
//! created and deleted by their own endpoints and carry no relation to the
//! history aggregate beyond sharing the submitted values.

pub mod store;

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::DomainError;

pub use store::{MemoryServiceStore, PgServiceStore, ServiceStore};

/// Lifecycle state of a scheduled service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServiceState {
    #[serde(rename = "Agendado")]
    Scheduled,
    #[serde(rename = "Em curso")]
    InProgress,
    #[serde(rename = "Concluído")]
    Completed,
    #[serde(rename = "Cancelado")]
    Cancelled,
}

impl ServiceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceState::Scheduled => "Agendado",
            ServiceState::InProgress => "Em curso",
            ServiceState::Completed => "Concluído",
            ServiceState::Cancelled => "Cancelado",
        }
    }
}

impl std::str::FromStr for ServiceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Agendado" => Ok(ServiceState::Scheduled),
            "Em curso" => Ok(ServiceState::InProgress),
            "Concluído" => Ok(ServiceState::Completed),
            "Cancelado" => Ok(ServiceState::Cancelled),
            other => Err(format!("unknown service state: {other}")),
        }
    }
}

/// A stored service record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecord {
    pub id: i64,
    #[serde(rename = "tripulante_id")]
    pub crew_member_id: String,
    #[serde(rename = "numero_servico")]
    pub service_number: String,
    #[serde(rename = "data")]
    pub date: NaiveDate,
    #[serde(rename = "hora_inicio")]
    pub start_time: NaiveTime,
    #[serde(rename = "hora_fim")]
    pub end_time: NaiveTime,
    #[serde(rename = "local_inicio")]
    pub start_location: String,
    #[serde(rename = "local_fim")]
    pub end_location: String,
    #[serde(rename = "numero_chapa")]
    pub vehicle_plate: String,
    #[serde(rename = "afetacao")]
    pub assignment: String,
    #[serde(rename = "estado")]
    pub state: ServiceState,
    #[serde(rename = "observacoes")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Values for a record about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewServiceRecord {
    pub crew_member_id: String,
    pub service_number: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub start_location: String,
    pub end_location: String,
    pub vehicle_plate: String,
    pub assignment: String,
}

impl NewServiceRecord {
    /// Free-text notes stored alongside the record
    pub fn notes(&self) -> String {
        format!(
            "Serviço: {} | Chapa: {} | Afetação: {}",
            self.service_number, self.vehicle_plate, self.assignment
        )
    }
}

/// Calendar month used to filter a crew member's services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthFilter {
    pub month: u32,
    pub year: i32,
}

impl MonthFilter {
    pub fn new(month: u32, year: i32) -> Result<Self, DomainError> {
        if !(1..=12).contains(&month) {
            return Err(DomainError::invalid("mes", "deve estar entre 1 e 12"));
        }
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(DomainError::invalid("ano", "ano fora do intervalo suportado"));
        }
        Ok(Self { month, year })
    }

    /// Half-open date range `[first day, first day of next month)`
    pub fn range(&self) -> (NaiveDate, NaiveDate) {
        let (next_year, next_month) = if self.month == 12 {
            (self.year + 1, 1)
        } else {
            (self.year, self.month + 1)
        };
        // both dates were validated in `new`
        let start = NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN);
        let end = NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap_or(NaiveDate::MAX);
        (start, end)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.month() == self.month && date.year() == self.year
    }
}
