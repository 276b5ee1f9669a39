//! API Routes
//!
//! Router assembly and the service (`/servicos`) endpoints.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::auth::{ensure_acting_for, AuthenticatedCrew};
use crate::domain::validation::{flexible_id, parse_date, parse_time, require};
use crate::domain::DomainError;
use crate::error::AppError;
use crate::handlers::{AutoFillHandler, CreateServiceCommand, CreateServiceHandler};
use crate::history::{HistoryKey, ServiceFields};
use crate::service_record::{MonthFilter, ServiceRecord};

use super::extract::{ApiJson, ApiQuery};
use super::{auth, avarias, checkins, gps, ordens, AppState};

// =========================================================================
// Request/Response types
// =========================================================================

/// Body of `POST /servicos`. Every field is required; they stay optional
/// here so a missing one is reported by name.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct CreateServiceRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub tripulante_id: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub numero_servico: Option<String>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub local_inicio: Option<String>,
    #[serde(default)]
    pub local_fim: Option<String>,
    #[serde(default)]
    pub hora_inicio: Option<String>,
    #[serde(default)]
    pub hora_fim: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub numero_chapa: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub afetacao: Option<String>,
}

impl CreateServiceRequest {
    /// Validate presence of every field, then formats
    pub fn into_command(self) -> Result<CreateServiceCommand, DomainError> {
        let crew_member_id = require("tripulante_id", self.tripulante_id)?;
        let service_number = require("numero_servico", self.numero_servico)?;
        let data = require("data", self.data)?;
        let start_location = require("local_inicio", self.local_inicio)?;
        let end_location = require("local_fim", self.local_fim)?;
        let hora_inicio = require("hora_inicio", self.hora_inicio)?;
        let hora_fim = require("hora_fim", self.hora_fim)?;
        let vehicle_plate = require("numero_chapa", self.numero_chapa)?;
        let assignment = require("afetacao", self.afetacao)?;

        let date = parse_date("data", &data)?;
        let start_time = parse_time("hora_inicio", &hora_inicio)?;
        let end_time = parse_time("hora_fim", &hora_fim)?;

        Ok(CreateServiceCommand::new(
            HistoryKey::new(crew_member_id, service_number),
            date,
            ServiceFields {
                start_location,
                end_location,
                start_time,
                end_time,
                vehicle_plate,
                assignment,
            },
        ))
    }
}

#[derive(Debug, Serialize)]
pub struct CreateServiceResponse {
    pub success: bool,
    pub message: String,
    pub servico: ServiceRecord,
}

#[derive(Debug, Deserialize)]
pub struct ServicesQuery {
    #[serde(default)]
    pub tripulante_id: Option<String>,
    #[serde(default)]
    pub mes: Option<u32>,
    #[serde(default)]
    pub ano: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct ServicesResponse {
    pub success: bool,
    pub servicos: Vec<ServiceRecord>,
}

#[derive(Debug, Deserialize)]
pub struct AutoFillQuery {
    #[serde(default)]
    pub tripulante_id: Option<String>,
    #[serde(default)]
    pub numero_servico: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AutoFillResponse {
    pub success: bool,
    pub auto_preenchimento: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dados: Option<ServiceFields>,
}

/// `?tripulante_id=` query used by owner-scoped deletes
#[derive(Debug, Deserialize)]
pub struct OwnerQuery {
    #[serde(default)]
    pub tripulante_id: Option<String>,
}

/// Plain acknowledgement body
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}

// =========================================================================
// API Router
// =========================================================================

/// Routes that require an authenticated crew member
pub fn create_router() -> Router<AppState> {
    Router::new()
        // Services
        .route("/servicos", get(list_services).post(create_service))
        .route("/servicos/auto-preenchimento", get(auto_fill))
        .route("/servicos/:id", delete(delete_service))
        // GPS
        .route("/gps/update", post(gps::update_position))
        .route("/gps/carreira/:codigo", get(gps::route_positions))
        .route("/gps/stop", post(gps::stop_sharing))
        // Check-ins and observations
        .route("/checkins", post(checkins::create_checkin))
        .route("/checkins/carreira/:codigo", get(checkins::route_checkins))
        .route("/observacoes", post(checkins::create_observation))
        .route("/observacoes/carreira/:codigo", get(checkins::route_observations))
        // Ordens de serviço
        .route("/ordens", get(ordens::list_notices).post(ordens::create_notice))
        .route("/ordens/:id", delete(ordens::remove_notice))
        // Vehicle faults
        .route("/avarias", get(avarias::list_faults).post(avarias::report_fault))
        .route("/avarias/:id/resolver", patch(avarias::resolve_fault))
        // Session
        .route("/auth/logout", post(auth::logout))
}

/// Routes reachable without a session
pub fn public_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/change-password", post(auth::change_password))
}

// =========================================================================
// GET /servicos
// =========================================================================

/// List a crew member's services, optionally for one month
async fn list_services(
    State(state): State<AppState>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiQuery(query): ApiQuery<ServicesQuery>,
) -> Result<Json<ServicesResponse>, AppError> {
    let crew_member_id = require("tripulante_id", query.tripulante_id)?;
    ensure_acting_for(caller.as_deref(), &crew_member_id)?;

    let month = match (query.mes, query.ano) {
        (Some(mes), Some(ano)) => Some(MonthFilter::new(mes, ano)?),
        _ => None,
    };

    let servicos = state.services.list(&crew_member_id, month).await?;

    Ok(Json(ServicesResponse {
        success: true,
        servicos,
    }))
}

// =========================================================================
// GET /servicos/auto-preenchimento
// =========================================================================

/// Pre-fill suggestion for a service number
async fn auto_fill(
    State(state): State<AppState>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiQuery(query): ApiQuery<AutoFillQuery>,
) -> Result<Json<AutoFillResponse>, AppError> {
    let (crew_member_id, service_number) = match (
        require("tripulante_id", query.tripulante_id),
        require("numero_servico", query.numero_servico),
    ) {
        (Ok(crew), Ok(number)) => (crew, number),
        _ => {
            return Err(AppError::InvalidRequest(
                "tripulante_id e numero_servico são obrigatórios".to_string(),
            ))
        }
    };
    ensure_acting_for(caller.as_deref(), &crew_member_id)?;

    let handler = AutoFillHandler::new(state.history);
    let dados = handler
        .execute(&HistoryKey::new(crew_member_id, service_number))
        .await?;

    Ok(Json(AutoFillResponse {
        success: true,
        auto_preenchimento: dados.is_some(),
        dados,
    }))
}

// =========================================================================
// POST /servicos
// =========================================================================

/// Create a service and update the crew member's history for it
async fn create_service(
    State(state): State<AppState>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<CreateServiceResponse>), AppError> {
    let command = request.into_command()?;
    ensure_acting_for(caller.as_deref(), &command.key.crew_member_id)?;

    let handler = CreateServiceHandler::new(state.services, state.history);
    let result = handler.execute(command).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateServiceResponse {
            success: true,
            message: "Serviço criado com sucesso".to_string(),
            servico: result.record,
        }),
    ))
}

// =========================================================================
// DELETE /servicos/:id
// =========================================================================

/// Delete a service owned by the crew member
async fn delete_service(
    State(state): State<AppState>,
    caller: Option<Extension<AuthenticatedCrew>>,
    Path(id): Path<i64>,
    ApiQuery(query): ApiQuery<OwnerQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let crew_member_id = require("tripulante_id", query.tripulante_id)?;
    ensure_acting_for(caller.as_deref(), &crew_member_id)?;

    if !state.services.delete_owned(id, &crew_member_id).await? {
        return Err(AppError::NotFound(
            "Serviço não encontrado ou não pertence ao utilizador".to_string(),
        ));
    }

    tracing::info!(service_id = id, tripulante_id = %crew_member_id, "Service deleted");

    Ok(Json(MessageResponse::ok("Serviço excluído com sucesso")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_request() -> CreateServiceRequest {
        serde_json::from_str(
            r#"{
                "tripulante_id": 18001,
                "numero_servico": "A1",
                "data": "2026-03-14",
                "local_inicio": "Garagem",
                "local_fim": "Terminal",
                "hora_inicio": "07:30",
                "hora_fim": "15:00",
                "numero_chapa": 545,
                "afetacao": "12E"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_create_service_request_into_command() {
        let command = full_request().into_command().unwrap();
        assert_eq!(command.key, HistoryKey::new("18001", "A1"));
        assert_eq!(command.fields.vehicle_plate, "545");
        assert_eq!(command.fields.start_location, "Garagem");
    }

    #[test]
    fn test_create_service_request_reports_missing_field() {
        let mut request = full_request();
        request.numero_chapa = None;
        assert_eq!(
            request.into_command(),
            Err(DomainError::MissingField("numero_chapa"))
        );
    }

    #[test]
    fn test_create_service_request_rejects_bad_time() {
        let mut request = full_request();
        request.hora_fim = Some("25:00".to_string());
        assert_eq!(
            request.into_command().unwrap_err().field(),
            Some("hora_fim")
        );
    }

    #[test]
    fn test_auto_fill_response_omits_empty_payload() {
        let body = serde_json::to_value(AutoFillResponse {
            success: true,
            auto_preenchimento: false,
            dados: None,
        })
        .unwrap();
        assert_eq!(body, serde_json::json!({"success": true, "auto_preenchimento": false}));
    }
}
