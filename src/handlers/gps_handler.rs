//! GPS position handler
//!
//! A crew member has at most one active position: publishing a new one
//! deactivates the previous rows in the same transaction.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

use super::RecordPositionCommand;

/// A stored GPS position
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct GpsPosition {
    pub id: i64,
    pub tripulante_id: String,
    pub veiculo_id: String,
    pub carreira_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub precisao: Option<f64>,
    pub velocidade: Option<f64>,
    pub ativo: bool,
    pub timestamp: DateTime<Utc>,
}

/// Handler for GPS updates
pub struct RecordPositionHandler {
    pool: PgPool,
}

impl RecordPositionHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Replace the crew member's active position with a new one
    pub async fn execute(&self, command: RecordPositionCommand) -> Result<GpsPosition, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE gps_positions SET ativo = false WHERE tripulante_id = $1 AND ativo = true")
            .bind(&command.crew_member_id)
            .execute(&mut *tx)
            .await?;

        let position: GpsPosition = sqlx::query_as(
            r#"
            INSERT INTO gps_positions
                (tripulante_id, veiculo_id, carreira_id, latitude, longitude, precisao, velocidade, ativo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, true)
            RETURNING id, tripulante_id, veiculo_id, carreira_id, latitude, longitude,
                      precisao, velocidade, ativo, timestamp
            "#,
        )
        .bind(&command.crew_member_id)
        .bind(&command.vehicle_id)
        .bind(&command.route_id)
        .bind(command.latitude)
        .bind(command.longitude)
        .bind(command.accuracy)
        .bind(command.speed)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::debug!(
            tripulante_id = %position.tripulante_id,
            carreira_id = %position.carreira_id,
            "GPS position updated"
        );

        Ok(position)
    }

    /// Stop sharing: deactivate every position of the crew member
    pub async fn stop(&self, crew_member_id: &str) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE gps_positions SET ativo = false WHERE tripulante_id = $1 AND ativo = true",
        )
        .bind(crew_member_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
