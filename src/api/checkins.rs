//! Check-in and route observation endpoints
//!
//! Both feeds are read per route and only cover the last day.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{ensure_acting_for, AuthenticatedCrew};
use crate::domain::validation::{flexible_id, optional, require, require_coordinate};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::handlers::{CheckIn, CheckInCommand, CheckInHandler};

use super::extract::ApiJson;

/// How far back the route feeds look
const FEED_WINDOW_HOURS: i64 = 24;
/// Maximum entries returned per feed
const FEED_LIMIT: i64 = 50;
/// Default observation type
pub const DEFAULT_OBSERVATION_KIND: &str = "Info";

fn feed_cutoff() -> DateTime<Utc> {
    Utc::now() - Duration::hours(FEED_WINDOW_HOURS)
}

/// Optional coordinates must come as a valid pair
fn coordinates(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<(f64, f64)>, DomainError> {
    match (latitude, longitude) {
        (None, None) => Ok(None),
        (lat, lon) => Ok(Some((
            require_coordinate("latitude", lat, 90.0)?,
            require_coordinate("longitude", lon, 180.0)?,
        ))),
    }
}

// =========================================================================
// Check-ins
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct CheckInRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
    #[serde(default)]
    pub local: Option<String>,
    #[serde(default)]
    pub servico_id: Option<i64>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub veiculo_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub carreira_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub tipo: Option<String>,
}

impl CheckInRequest {
    pub fn into_command(self) -> Result<CheckInCommand, DomainError> {
        let mut command = CheckInCommand::new(
            require("tripulante_id", self.tripulante_id)?,
            require("local", self.local)?,
        );
        if let Some(kind) = optional(self.tipo) {
            command = command.with_kind(kind);
        }
        if let Some(service_id) = self.servico_id {
            command = command.with_service(service_id);
        }
        if let Some(vehicle_id) = optional(self.veiculo_id) {
            command = command.with_vehicle(vehicle_id);
        }
        if let Some(route_id) = optional(self.carreira_id) {
            command = command.with_route(route_id);
        }
        if let Some((latitude, longitude)) = coordinates(self.latitude, self.longitude)? {
            command = command.with_coordinates(latitude, longitude);
        }
        Ok(command)
    }
}

#[derive(Debug, Serialize)]
pub struct CheckInResponse {
    pub success: bool,
    pub checkin: CheckIn,
}

#[derive(Debug, Serialize)]
pub struct CheckInsResponse {
    pub success: bool,
    pub checkins: Vec<RouteCheckIn>,
}

/// Check-in on a route, with the crew member's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RouteCheckIn {
    pub id: i64,
    pub tripulante_id: String,
    pub nome: Option<String>,
    pub veiculo_id: Option<String>,
    pub local: String,
    pub tipo: String,
    pub timestamp: DateTime<Utc>,
}

pub async fn create_checkin(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<CheckInRequest>,
) -> Result<(StatusCode, Json<CheckInResponse>), AppError> {
    let command = request.into_command()?;
    ensure_acting_for(caller.as_deref(), &command.crew_member_id)?;

    let checkin = CheckInHandler::new(pool).execute(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(CheckInResponse {
            success: true,
            checkin,
        }),
    ))
}

pub async fn route_checkins(
    State(pool): State<PgPool>,
    Path(codigo): Path<String>,
) -> Result<Json<CheckInsResponse>, AppError> {
    let checkins: Vec<RouteCheckIn> = sqlx::query_as(
        r#"
        SELECT c.id, c.tripulante_id, u.nome, c.veiculo_id, c.local, c.tipo, c.timestamp
        FROM check_ins c
        LEFT JOIN utilizadores u ON u.numero = c.tripulante_id
        WHERE c.carreira_id = $1 AND c.timestamp > $2
        ORDER BY c.timestamp DESC
        LIMIT $3
        "#,
    )
    .bind(&codigo)
    .bind(feed_cutoff())
    .bind(FEED_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(CheckInsResponse {
        success: true,
        checkins,
    }))
}

// =========================================================================
// Observations
// =========================================================================

#[derive(Debug, Default, Deserialize)]
pub struct ObservationRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub carreira_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub veiculo_id: Option<String>,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// A stored route observation
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Observation {
    pub id: i64,
    pub carreira_id: String,
    pub tripulante_id: String,
    pub nome: Option<String>,
    pub veiculo_id: Option<String>,
    pub tipo: String,
    pub mensagem: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ObservationResponse {
    pub success: bool,
    pub observacao: Observation,
}

#[derive(Debug, Serialize)]
pub struct ObservationsResponse {
    pub success: bool,
    pub observacoes: Vec<Observation>,
}

pub async fn create_observation(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<ObservationRequest>,
) -> Result<(StatusCode, Json<ObservationResponse>), AppError> {
    let crew_member_id = require("tripulante_id", request.tripulante_id)?;
    let route_id = require("carreira_id", request.carreira_id)?;
    let message = require("mensagem", request.mensagem)?;
    let kind = optional(request.tipo).unwrap_or_else(|| DEFAULT_OBSERVATION_KIND.to_string());
    let position = coordinates(request.latitude, request.longitude)?;
    ensure_acting_for(caller.as_deref(), &crew_member_id)?;

    let observacao: Observation = sqlx::query_as(
        r#"
        WITH inserted AS (
            INSERT INTO observacoes
                (carreira_id, tripulante_id, veiculo_id, tipo, mensagem, latitude, longitude)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
        )
        SELECT i.id, i.carreira_id, i.tripulante_id, u.nome, i.veiculo_id, i.tipo,
               i.mensagem, i.latitude, i.longitude, i.timestamp
        FROM inserted i
        LEFT JOIN utilizadores u ON u.numero = i.tripulante_id
        "#,
    )
    .bind(&route_id)
    .bind(&crew_member_id)
    .bind(optional(request.veiculo_id))
    .bind(&kind)
    .bind(&message)
    .bind(position.map(|(lat, _)| lat))
    .bind(position.map(|(_, lon)| lon))
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        observacao_id = observacao.id,
        carreira_id = %route_id,
        tipo = %kind,
        "Observation posted"
    );

    Ok((
        StatusCode::CREATED,
        Json(ObservationResponse {
            success: true,
            observacao,
        }),
    ))
}

pub async fn route_observations(
    State(pool): State<PgPool>,
    Path(codigo): Path<String>,
) -> Result<Json<ObservationsResponse>, AppError> {
    let observacoes: Vec<Observation> = sqlx::query_as(
        r#"
        SELECT o.id, o.carreira_id, o.tripulante_id, u.nome, o.veiculo_id, o.tipo,
               o.mensagem, o.latitude, o.longitude, o.timestamp
        FROM observacoes o
        LEFT JOIN utilizadores u ON u.numero = o.tripulante_id
        WHERE o.carreira_id = $1 AND o.timestamp > $2
        ORDER BY o.timestamp DESC
        LIMIT $3
        "#,
    )
    .bind(&codigo)
    .bind(feed_cutoff())
    .bind(FEED_LIMIT)
    .fetch_all(&pool)
    .await?;

    Ok(Json(ObservationsResponse {
        success: true,
        observacoes,
    }))
}
