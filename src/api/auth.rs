//! Authentication endpoints (`/auth`)

use axum::{
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::auth::password::{
    hash_password_blocking, verify_account_password_blocking, MIN_PASSWORD_LEN,
};
use crate::auth::{
    authorize_requested_role, AuthRepository, AuthenticatedCrew, NewCrewAccount,
    StoredCrewAccount,
};
use crate::domain::validation::{flexible_id, optional, require};
use crate::domain::{CrewRole, DomainError};
use crate::error::AppError;

use super::extract::ApiJson;
use super::middleware::bearer_token;
use super::routes::MessageResponse;
use super::ApiSettings;

const INVALID_CREDENTIALS: &str = "Número ou password incorretos";

// =========================================================================
// Request/Response types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub numero: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub numero: Option<String>,
    #[serde(default)]
    pub nome: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub cargo: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    #[serde(default, deserialize_with = "flexible_id")]
    pub numero: Option<String>,
    #[serde(default)]
    pub current_password: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Public view of a crew account
#[derive(Debug, Clone, Serialize)]
pub struct CrewProfile {
    pub numero: String,
    pub nome: String,
    pub cargo: CrewRole,
    pub email: String,
}

impl From<StoredCrewAccount> for CrewProfile {
    fn from(account: StoredCrewAccount) -> Self {
        Self {
            numero: account.numero,
            nome: account.nome,
            cargo: account.cargo,
            email: account.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub success: bool,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: CrewProfile,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user: CrewProfile,
}

fn require_password(field: &'static str, value: Option<String>) -> Result<String, DomainError> {
    // Passwords are taken as typed, only blank is rejected
    let password = value
        .filter(|p| !p.trim().is_empty())
        .ok_or(DomainError::MissingField(field))?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::invalid(
            field,
            format!("deve ter pelo menos {MIN_PASSWORD_LEN} caracteres"),
        ));
    }
    Ok(password)
}

// =========================================================================
// POST /auth/login
// =========================================================================

pub async fn login(
    State(pool): State<PgPool>,
    State(settings): State<ApiSettings>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let numero = require("numero", request.numero)?;
    let password = request
        .password
        .filter(|p| !p.is_empty())
        .ok_or(DomainError::MissingField("password"))?;

    let repo = AuthRepository::new(pool);

    // Unknown and inactive badges still go through a full bcrypt check
    let account = repo.find_account(&numero).await?.filter(|account| account.ativo);
    let stored = account.as_ref().map(|account| account.password_hash.clone());
    let verified = verify_account_password_blocking(password, stored).await?;

    let account = match account {
        Some(account) if verified => account,
        _ => {
            tracing::warn!(numero = %numero, "Failed login attempt");
            return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }
    };

    let (token, expires_at) = repo.create_session(&numero, settings.session_ttl).await?;

    tracing::info!(numero = %numero, cargo = %account.cargo, "Crew member logged in");

    Ok(Json(LoginResponse {
        success: true,
        token,
        expires_at,
        user: account.into(),
    }))
}

// =========================================================================
// POST /auth/register
// =========================================================================

pub async fn register(
    State(pool): State<PgPool>,
    headers: HeaderMap,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let numero = require("numero", request.numero)?;
    let nome = require("nome", request.nome)?;
    let email = require("email", request.email)?;
    let password = require_password("password", request.password)?;
    let cargo = match optional(request.cargo) {
        Some(cargo) => cargo
            .parse::<CrewRole>()
            .map_err(|_| DomainError::invalid("cargo", "deve ser Tripulante, Tripulante+ ou Gestor"))?,
        None => CrewRole::default(),
    };

    let repo = AuthRepository::new(pool);

    // The route is public, so a session is only looked up for elevated roles
    let caller = match bearer_token(&headers) {
        Some(token) if cargo != CrewRole::Crew => repo.resolve_session(token).await?,
        _ => None,
    };
    authorize_requested_role(cargo, caller.as_ref())?;

    if let Some(field) = repo.find_duplicate(&numero, &email).await? {
        return Err(AppError::Conflict(format!("Já existe um utilizador com este {field}")));
    }

    let account = NewCrewAccount {
        numero: numero.clone(),
        nome: nome.clone(),
        email: email.clone(),
        cargo,
        password_hash: hash_password_blocking(password).await?,
    };

    // A concurrent registration can still win the race past the check above
    repo.create_account(&account).await.map_err(|e| {
        if e.is_unique_violation() {
            AppError::Conflict("Utilizador já existe".to_string())
        } else {
            AppError::from(e)
        }
    })?;

    tracing::info!(
        numero = %numero,
        cargo = %cargo,
        granted_by = caller.as_ref().map(|crew| crew.numero.as_str()),
        "Crew account registered"
    );

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            success: true,
            message: "Utilizador registado com sucesso".to_string(),
            user: CrewProfile {
                numero,
                nome,
                cargo,
                email,
            },
        }),
    ))
}

// =========================================================================
// POST /auth/change-password
// =========================================================================

pub async fn change_password(
    State(pool): State<PgPool>,
    ApiJson(request): ApiJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    let numero = require("numero", request.numero)?;
    let current = request
        .current_password
        .filter(|p| !p.is_empty())
        .ok_or(DomainError::MissingField("currentPassword"))?;
    let new_password = require_password("newPassword", request.new_password)?;

    let repo = AuthRepository::new(pool);

    let account = repo
        .find_account(&numero)
        .await?
        .ok_or_else(|| AppError::NotFound("Utilizador não encontrado".to_string()))?;

    if !verify_account_password_blocking(current, Some(account.password_hash)).await? {
        return Err(AppError::Unauthorized("Password atual incorreta".to_string()));
    }

    let password_hash = hash_password_blocking(new_password).await?;
    repo.update_password(&numero, &password_hash).await?;

    tracing::info!(numero = %numero, "Password changed, sessions revoked");

    Ok(Json(MessageResponse::ok("Password alterada com sucesso")))
}

// =========================================================================
// POST /auth/logout
// =========================================================================

pub async fn logout(
    State(pool): State<PgPool>,
    caller: Option<Extension<AuthenticatedCrew>>,
    headers: HeaderMap,
) -> Result<Json<MessageResponse>, AppError> {
    let token = bearer_token(&headers)
        .ok_or_else(|| AppError::Unauthorized("Sessão em falta".to_string()))?;

    AuthRepository::new(pool).delete_session(token).await?;

    if let Some(Extension(crew)) = caller {
        tracing::info!(numero = %crew.numero, "Crew member logged out");
    }

    Ok(Json(MessageResponse::ok("Sessão terminada")))
}
