//! GPS sharing endpoints (`/gps`)

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{ensure_acting_for, AuthenticatedCrew};
use crate::domain::validation::{flexible_id, require, require_coordinate};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::handlers::{GpsPosition, RecordPositionCommand, RecordPositionHandler};

use super::extract::ApiJson;
use super::routes::MessageResponse;
use super::ApiSettings;

#[derive(Debug, Default, Deserialize)]
pub struct UpdatePositionRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub veiculo_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub carreira_id: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub precisao: Option<f64>,
    #[serde(default)]
    pub velocidade: Option<f64>,
}

impl UpdatePositionRequest {
    pub fn into_command(self) -> Result<RecordPositionCommand, DomainError> {
        Ok(RecordPositionCommand {
            crew_member_id: require("tripulante_id", self.tripulante_id)?,
            vehicle_id: require("veiculo_id", self.veiculo_id)?,
            route_id: require("carreira_id", self.carreira_id)?,
            latitude: require_coordinate("latitude", self.latitude, 90.0)?,
            longitude: require_coordinate("longitude", self.longitude, 180.0)?,
            accuracy: self.precisao,
            speed: self.velocidade,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct StopSharingRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpdatePositionResponse {
    pub success: bool,
    pub posicao: GpsPosition,
}

/// Active position on a route, with the crew member's name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RoutePosition {
    pub tripulante_id: String,
    pub nome: Option<String>,
    pub veiculo_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub precisao: Option<f64>,
    pub velocidade: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RoutePositionsResponse {
    pub success: bool,
    pub carreira_id: String,
    pub posicoes: Vec<RoutePosition>,
}

/// Publish the crew member's current position
pub async fn update_position(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<UpdatePositionRequest>,
) -> Result<Json<UpdatePositionResponse>, AppError> {
    let command = request.into_command()?;
    ensure_acting_for(caller.as_deref(), &command.crew_member_id)?;

    let posicao = RecordPositionHandler::new(pool).execute(command).await?;

    Ok(Json(UpdatePositionResponse {
        success: true,
        posicao,
    }))
}

/// Fresh active positions on a route, newest first
pub async fn route_positions(
    State(pool): State<PgPool>,
    State(settings): State<ApiSettings>,
    Path(codigo): Path<String>,
) -> Result<Json<RoutePositionsResponse>, AppError> {
    let cutoff = Utc::now() - settings.gps_stale_after;

    let posicoes: Vec<RoutePosition> = sqlx::query_as(
        r#"
        SELECT g.tripulante_id, u.nome, g.veiculo_id, g.latitude, g.longitude,
               g.precisao, g.velocidade, g.timestamp
        FROM gps_positions g
        LEFT JOIN utilizadores u ON u.numero = g.tripulante_id
        WHERE g.carreira_id = $1 AND g.ativo = true AND g.timestamp > $2
        ORDER BY g.timestamp DESC
        "#,
    )
    .bind(&codigo)
    .bind(cutoff)
    .fetch_all(&pool)
    .await?;

    Ok(Json(RoutePositionsResponse {
        success: true,
        carreira_id: codigo,
        posicoes,
    }))
}

/// Stop sharing the crew member's position
pub async fn stop_sharing(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<StopSharingRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let crew_member_id = require("tripulante_id", request.tripulante_id)?;
    ensure_acting_for(caller.as_deref(), &crew_member_id)?;

    let stopped = RecordPositionHandler::new(pool).stop(&crew_member_id).await?;

    tracing::debug!(tripulante_id = %crew_member_id, stopped, "GPS sharing stopped");

    Ok(Json(MessageResponse::ok("Partilha de GPS terminada")))
}
