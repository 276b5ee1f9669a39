//! Check-in handler
//!
//! A check-in marks a crew member's arrival at a hand-off point. When the
//! route is known the arrival is also posted as an observation on it.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;

use super::CheckInCommand;

/// Observation type used for arrivals
pub const CHECKIN_OBSERVATION_KIND: &str = "Check-in";

/// A stored check-in
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CheckIn {
    pub id: i64,
    pub tripulante_id: String,
    pub servico_id: Option<i64>,
    pub veiculo_id: Option<String>,
    pub carreira_id: Option<String>,
    pub local: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub tipo: String,
    pub timestamp: DateTime<Utc>,
}

/// Handler for check-ins
pub struct CheckInHandler {
    pool: PgPool,
}

impl CheckInHandler {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record the check-in and its route observation atomically
    pub async fn execute(&self, command: CheckInCommand) -> Result<CheckIn, AppError> {
        let mut tx = self.pool.begin().await?;

        let checkin: CheckIn = sqlx::query_as(
            r#"
            INSERT INTO check_ins
                (tripulante_id, servico_id, veiculo_id, carreira_id, local, latitude, longitude, tipo)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, tripulante_id, servico_id, veiculo_id, carreira_id, local,
                      latitude, longitude, tipo, timestamp
            "#,
        )
        .bind(&command.crew_member_id)
        .bind(command.service_id)
        .bind(&command.vehicle_id)
        .bind(&command.route_id)
        .bind(&command.location)
        .bind(command.latitude)
        .bind(command.longitude)
        .bind(&command.kind)
        .fetch_one(&mut *tx)
        .await?;

        if let Some(route_id) = &command.route_id {
            sqlx::query(
                r#"
                INSERT INTO observacoes
                    (carreira_id, tripulante_id, veiculo_id, tipo, mensagem, latitude, longitude)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(route_id)
            .bind(&command.crew_member_id)
            .bind(&command.vehicle_id)
            .bind(CHECKIN_OBSERVATION_KIND)
            .bind(command.arrival_message())
            .bind(command.latitude)
            .bind(command.longitude)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::info!(
            checkin_id = checkin.id,
            tripulante_id = %checkin.tripulante_id,
            local = %checkin.local,
            "Check-in recorded"
        );

        Ok(checkin)
    }
}
