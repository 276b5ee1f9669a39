//! Ordens de serviço (`/ordens`)
//!
//! Short-lived notices published by senior crew and managers, either for a
//! single route or for everyone. Expired notices are soft-deleted by the
//! job scheduler.

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::{ensure_acting_for, AuthenticatedCrew};
use crate::domain::validation::{flexible_id, optional, require};
use crate::domain::DomainError;
use crate::error::AppError;

use super::extract::{ApiJson, ApiQuery};
use super::routes::MessageResponse;

/// Validity used when the author gives none
pub const DEFAULT_VALIDITY_MINUTES: i64 = 240;
/// Longest allowed validity (one week)
pub const MAX_VALIDITY_MINUTES: i64 = 7 * 24 * 60;

/// A notice row
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceNotice {
    pub id: i64,
    pub autor_id: String,
    pub titulo: String,
    pub mensagem: String,
    pub carreira_id: Option<String>,
    pub ativo: bool,
    pub criada_em: DateTime<Utc>,
    pub expira_em: DateTime<Utc>,
    pub removida_em: Option<DateTime<Utc>>,
}

const NOTICE_COLUMNS: &str =
    "id, autor_id, titulo, mensagem, carreira_id, ativo, criada_em, expira_em, removida_em";

#[derive(Debug, Default, Deserialize)]
pub struct CreateNoticeRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub autor_id: Option<String>,
    #[serde(default)]
    pub titulo: Option<String>,
    #[serde(default)]
    pub mensagem: Option<String>,
    #[serde(default, deserialize_with = "flexible_id")]
    pub carreira_id: Option<String>,
    #[serde(default)]
    pub validade_minutos: Option<i64>,
}

/// Checked notice values
#[derive(Debug, Clone, PartialEq)]
pub struct NewNotice {
    pub author_id: String,
    pub title: String,
    pub message: String,
    pub route_id: Option<String>,
    pub validity: Duration,
}

impl CreateNoticeRequest {
    pub fn validate(self) -> Result<NewNotice, DomainError> {
        let minutes = self.validade_minutos.unwrap_or(DEFAULT_VALIDITY_MINUTES);
        if !(1..=MAX_VALIDITY_MINUTES).contains(&minutes) {
            return Err(DomainError::invalid(
                "validade_minutos",
                format!("deve estar entre 1 e {MAX_VALIDITY_MINUTES}"),
            ));
        }

        Ok(NewNotice {
            author_id: require("autor_id", self.autor_id)?,
            title: require("titulo", self.titulo)?,
            message: require("mensagem", self.mensagem)?,
            route_id: optional(self.carreira_id),
            validity: Duration::minutes(minutes),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct NoticesQuery {
    #[serde(default)]
    pub carreira_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AuthorQuery {
    #[serde(default)]
    pub autor_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NoticeResponse {
    pub success: bool,
    pub ordem: ServiceNotice,
}

#[derive(Debug, Serialize)]
pub struct NoticesResponse {
    pub success: bool,
    pub ordens: Vec<ServiceNotice>,
}

/// Publish a notice
pub async fn create_notice(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    ApiJson(request): ApiJson<CreateNoticeRequest>,
) -> Result<(StatusCode, Json<NoticeResponse>), AppError> {
    let notice = request.validate()?;

    if let Some(Extension(crew)) = &caller {
        if !crew.cargo.can_publish_notices() {
            return Err(AppError::Forbidden(
                "Apenas Tripulante+ ou Gestor podem publicar ordens de serviço".to_string(),
            ));
        }
    }
    ensure_acting_for(caller.as_deref(), &notice.author_id)?;

    let expires_at = Utc::now() + notice.validity;

    let ordem: ServiceNotice = sqlx::query_as(&format!(
        r#"
        INSERT INTO ordens_servico (autor_id, titulo, mensagem, carreira_id, ativo, expira_em)
        VALUES ($1, $2, $3, $4, true, $5)
        RETURNING {NOTICE_COLUMNS}
        "#
    ))
    .bind(&notice.author_id)
    .bind(&notice.title)
    .bind(&notice.message)
    .bind(&notice.route_id)
    .bind(expires_at)
    .fetch_one(&pool)
    .await?;

    tracing::info!(
        ordem_id = ordem.id,
        autor_id = %ordem.autor_id,
        carreira_id = ?ordem.carreira_id,
        expira_em = %ordem.expira_em,
        "Service notice published"
    );

    Ok((
        StatusCode::CREATED,
        Json(NoticeResponse {
            success: true,
            ordem,
        }),
    ))
}

/// Active notices for a route plus the global ones, newest first
pub async fn list_notices(
    State(pool): State<PgPool>,
    ApiQuery(query): ApiQuery<NoticesQuery>,
) -> Result<Json<NoticesResponse>, AppError> {
    let route_id = optional(query.carreira_id);

    let ordens: Vec<ServiceNotice> = sqlx::query_as(&format!(
        r#"
        SELECT {NOTICE_COLUMNS}
        FROM ordens_servico
        WHERE ativo = true
          AND expira_em > NOW()
          AND (carreira_id IS NULL OR carreira_id = $1)
        ORDER BY criada_em DESC
        "#
    ))
    .bind(route_id)
    .fetch_all(&pool)
    .await?;

    Ok(Json(NoticesResponse {
        success: true,
        ordens,
    }))
}

/// Withdraw a notice. Only its author may do so.
pub async fn remove_notice(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    Path(id): Path<i64>,
    ApiQuery(query): ApiQuery<AuthorQuery>,
) -> Result<Json<MessageResponse>, AppError> {
    let author_id = require("autor_id", query.autor_id)?;
    ensure_acting_for(caller.as_deref(), &author_id)?;

    let result = sqlx::query(
        r#"
        UPDATE ordens_servico
        SET ativo = false, removida_em = NOW()
        WHERE id = $1 AND autor_id = $2 AND ativo = true
        "#,
    )
    .bind(id)
    .bind(&author_id)
    .execute(&pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Ordem de serviço não encontrada ou não pertence ao autor".to_string(),
        ));
    }

    tracing::info!(ordem_id = id, autor_id = %author_id, "Service notice removed");

    Ok(Json(MessageResponse::ok("Ordem de serviço removida")))
}
