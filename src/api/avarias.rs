//! Vehicle fault reports (`/avarias`)

use std::fmt;
use std::str::FromStr;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{ensure_acting_for, AuthenticatedCrew};
use crate::domain::validation::{flexible_id, optional, require};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::storage::StoreError;

use super::extract::{ApiJson, ApiQuery};

const FAULTS_LIMIT: i64 = 100;

/// How serious a reported fault is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FaultSeverity {
    #[serde(rename = "Baixa")]
    Low,
    #[default]
    #[serde(rename = "Media")]
    Medium,
    #[serde(rename = "Alta")]
    High,
}

impl FaultSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultSeverity::Low => "Baixa",
            FaultSeverity::Medium => "Media",
            FaultSeverity::High => "Alta",
        }
    }
}

impl FromStr for FaultSeverity {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Baixa" => Ok(FaultSeverity::Low),
            "Media" => Ok(FaultSeverity::Medium),
            "Alta" => Ok(FaultSeverity::High),
            _ => Err(DomainError::invalid("gravidade", "deve ser Baixa, Media ou Alta")),
        }
    }
}

/// Lifecycle of a fault report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultStatus {
    #[serde(rename = "Aberta")]
    Open,
    #[serde(rename = "Resolvida")]
    Resolved,
}

impl FaultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FaultStatus::Open => "Aberta",
            FaultStatus::Resolved => "Resolvida",
        }
    }
}

impl FromStr for FaultStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Aberta" => Ok(FaultStatus::Open),
            "Resolvida" => Ok(FaultStatus::Resolved),
            _ => Err(DomainError::invalid("estado", "deve ser Aberta ou Resolvida")),
        }
    }
}

impl fmt::Display for FaultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fault report as returned to clients
#[derive(Debug, Clone, Serialize)]
pub struct FaultReport {
    pub id: i64,
    pub tripulante_id: String,
    pub veiculo_id: String,
    pub carreira_id: Option<String>,
    pub descricao: String,
    pub gravidade: FaultSeverity,
    pub estado: FaultStatus,
    pub reportada_em: DateTime<Utc>,
    pub resolvida_por: Option<String>,
    pub resolvida_em: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct FaultRow {
    id: i64,
    tripulante_id: String,
    veiculo_id: String,
    carreira_id: Option<String>,
    descricao: String,
    gravidade: String,
    estado: String,
    reportada_em: DateTime<Utc>,
    resolvida_por: Option<String>,
    resolvida_em: Option<DateTime<Utc>>,
}

impl TryFrom<FaultRow> for FaultReport {
    type Error = StoreError;

    fn try_from(row: FaultRow) -> Result<Self, Self::Error> {
        Ok(FaultReport {
            id: row.id,
            tripulante_id: row.tripulante_id,
            veiculo_id: row.veiculo_id,
            carreira_id: row.carreira_id,
            descricao: row.descricao,
            gravidade: row
                .gravidade
                .parse()
                .map_err(|e: DomainError| StoreError::Corrupt(e.to_string()))?,
            estado: row
                .estado
                .parse()
                .map_err(|e: DomainError| StoreError::Corrupt(e.to_string()))?,
            reportada_em: row.reportada_em,
            resolvida_por: row.resolvida_por,
            resolvida_em: row.resolvida_em,
        })
    }
}

const FAULT_COLUMNS: &str = "id, tripulante_id, veiculo_id, carreira_id, descricao, gravidade, \
                             estado, reportada_em, resolvida_por, resolvida_em";

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ReportFaultRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub veiculo_id: Option<String>,
    #[serde(default)]
    pub descricao: Option<String>,
    #[serde(default)]
    pub gravidade: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub carreira_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewFault {
    pub reporter_id: String,
    pub vehicle_id: String,
    pub description: String,
    pub severity: FaultSeverity,
    pub route_id: Option<String>,
}

impl ReportFaultRequest {
    pub fn validate(self) -> Result<NewFault, DomainError> {
        let severity = match optional(self.gravidade) {
            Some(value) => value.parse()?,
            None => FaultSeverity::default(),
        };

        Ok(NewFault {
            reporter_id: require("tripulante_id", self.tripulante_id)?,
            vehicle_id: require("veiculo_id", self.veiculo_id)?,
            description: require("descricao", self.descricao)?,
            severity,
            route_id: optional(self.carreira_id),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct FaultsQuery {
    #[serde(default)]
    pub veiculo_id: Option<String>,
    #[serde(default)]
    pub estado: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveFaultRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FaultResponse {
    pub success: bool,
    pub avaria: FaultReport,
}

#[derive(Debug, Serialize)]
pub struct FaultsResponse {
    pub success: bool,
    pub avarias: Vec<FaultReport>,
}

// =========================================================================
// Handlers
// =========================================================================

/// Report a fault on a vehicle
pub async fn report_fault(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<ReportFaultRequest>,
) -> Result<(StatusCode, Json<FaultResponse>), AppError> {
    let fault = request.validate()?;
    ensure_acting_for(caller.as_deref(), &fault.reporter_id)?;

    let row: FaultRow = sqlx::query_as(&format!(
        r#"
        INSERT INTO avarias (tripulante_id, veiculo_id, carreira_id, descricao, gravidade, estado)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {FAULT_COLUMNS}
        "#
    ))
    .bind(&fault.reporter_id)
    .bind(&fault.vehicle_id)
    .bind(&fault.route_id)
    .bind(&fault.description)
    .bind(fault.severity.as_str())
    .bind(FaultStatus::Open.as_str())
    .fetch_one(&pool)
    .await?;

    let avaria = FaultReport::try_from(row)?;

    tracing::info!(
        avaria_id = avaria.id,
        veiculo_id = %avaria.veiculo_id,
        gravidade = avaria.gravidade.as_str(),
        "Vehicle fault reported"
    );

    Ok((
        StatusCode::CREATED,
        Json(FaultResponse {
            success: true,
            avaria,
        }),
    ))
}

/// List fault reports, newest first
pub async fn list_faults(
    State(pool): State<PgPool>,
    ApiQuery(query): ApiQuery<FaultsQuery>,
) -> Result<Json<FaultsResponse>, AppError> {
    let status = optional(query.estado)
        .map(|s| s.parse::<FaultStatus>())
        .transpose()?;

    let rows: Vec<FaultRow> = sqlx::query_as(&format!(
        r#"
        SELECT {FAULT_COLUMNS}
        FROM avarias
        WHERE ($1::TEXT IS NULL OR veiculo_id = $1)
          AND ($2::TEXT IS NULL OR estado = $2)
        ORDER BY reportada_em DESC
        LIMIT $3
        "#
    ))
    .bind(optional(query.veiculo_id))
    .bind(status.map(|s| s.as_str()))
    .bind(FAULTS_LIMIT)
    .fetch_all(&pool)
    .await?;

    let avarias = rows
        .into_iter()
        .map(FaultReport::try_from)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Json(FaultsResponse {
        success: true,
        avarias,
    }))
}

/// Mark an open fault as resolved
pub async fn resolve_fault(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    Path(id): Path<i64>,
    ApiJson(request): ApiJson<ResolveFaultRequest>,
) -> Result<Json<FaultResponse>, AppError> {
    let resolver_id = require("tripulante_id", request.tripulante_id)?;
    ensure_acting_for(caller.as_deref(), &resolver_id)?;

    let row: Option<FaultRow> = sqlx::query_as(&format!(
        r#"
        UPDATE avarias
        SET estado = $1, resolvida_por = $2, resolvida_em = NOW()
        WHERE id = $3 AND estado <> $1
        RETURNING {FAULT_COLUMNS}
        "#
    ))
    .bind(FaultStatus::Resolved.as_str())
    .bind(&resolver_id)
    .bind(id)
    .fetch_optional(&pool)
    .await?;

    let row = row.ok_or_else(|| {
        AppError::NotFound("Avaria não encontrada ou já resolvida".to_string())
    })?;
    let avaria = FaultReport::try_from(row)?;

    tracing::info!(avaria_id = id, resolvida_por = %resolver_id, "Vehicle fault resolved");

    Ok(Json(FaultResponse {
        success: true,
        avaria,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_wire_names() {
        assert_eq!(serde_json::to_value(FaultSeverity::Medium).unwrap(), "Media");
        assert_eq!("Alta".parse::<FaultSeverity>().unwrap(), FaultSeverity::High);
        assert_eq!(
            "Critica".parse::<FaultSeverity>().unwrap_err().field(),
            Some("gravidade")
        );
    }

    #[test]
    fn test_status_round_trips_through_column_text() {
        for status in [FaultStatus::Open, FaultStatus::Resolved] {
            assert_eq!(status.as_str().parse::<FaultStatus>().unwrap(), status);
        }
        assert!("Fechada".parse::<FaultStatus>().is_err());
    }

    #[test]
    fn test_report_defaults_to_medium_severity() {
        let request: ReportFaultRequest = serde_json::from_str(
            r#"{"tripulante_id": 18001, "veiculo_id": 545, "descricao": "Porta traseira não fecha"}"#,
        )
        .unwrap();
        let fault = request.validate().unwrap();

        assert_eq!(fault.severity, FaultSeverity::Medium);
        assert_eq!(fault.vehicle_id, "545");
        assert!(fault.route_id.is_none());
    }

    #[test]
    fn test_report_rejects_unknown_severity() {
        let request = ReportFaultRequest {
            tripulante_id: Some("18001".to_string()),
            veiculo_id: Some("545".to_string()),
            descricao: Some("Travão".to_string()),
            gravidade: Some("Urgente".to_string()),
            ..Default::default()
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_corrupt_row_is_reported() {
        let row = FaultRow {
            id: 1,
            tripulante_id: "18001".to_string(),
            veiculo_id: "545".to_string(),
            carreira_id: None,
            descricao: "Travão".to_string(),
            gravidade: "??".to_string(),
            estado: "Aberta".to_string(),
            reportada_em: Utc::now(),
            resolvida_por: None,
            resolvida_em: None,
        };
        assert!(matches!(
            FaultReport::try_from(row),
            Err(StoreError::Corrupt(_))
        ));
    }
}
