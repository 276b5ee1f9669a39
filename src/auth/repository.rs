//! Crew account and session repository

use chrono::{DateTime, Duration, Utc};
use sqlx::PgPool;

use crate::domain::CrewRole;
use crate::storage::StoreError;

use super::password::{generate_token, token_hash};
use super::AuthenticatedCrew;

/// Crew account as stored in `utilizadores`
#[derive(Debug, Clone)]
pub struct StoredCrewAccount {
    pub numero: String,
    pub nome: String,
    pub email: String,
    pub cargo: CrewRole,
    pub password_hash: String,
    pub ativo: bool,
}

/// Values for a new crew account
#[derive(Debug, Clone)]
pub struct NewCrewAccount {
    pub numero: String,
    pub nome: String,
    pub email: String,
    pub cargo: CrewRole,
    pub password_hash: String,
}

/// Repository for crew accounts and their sessions
#[derive(Debug, Clone)]
pub struct AuthRepository {
    pool: PgPool,
}

impl AuthRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an account by badge number, active or not
    pub async fn find_account(&self, numero: &str) -> Result<Option<StoredCrewAccount>, StoreError> {
        let row: Option<(String, String, String, String, String, bool)> = sqlx::query_as(
            r#"
            SELECT numero, nome, email, cargo, password_hash, ativo
            FROM utilizadores
            WHERE numero = $1
            "#,
        )
        .bind(numero)
        .fetch_optional(&self.pool)
        .await?;

        row.map(
            |(numero, nome, email, cargo, password_hash, ativo)| -> Result<_, StoreError> {
                Ok(StoredCrewAccount {
                    numero,
                    nome,
                    email,
                    cargo: cargo.parse().map_err(StoreError::Corrupt)?,
                    password_hash,
                    ativo,
                })
            },
        )
        .transpose()
    }

    /// Whether a badge number or email is already registered.
    /// Returns the name of the clashing field.
    pub async fn find_duplicate(
        &self,
        numero: &str,
        email: &str,
    ) -> Result<Option<&'static str>, StoreError> {
        let (numero_taken, email_taken): (bool, bool) = sqlx::query_as(
            r#"
            SELECT
                EXISTS (SELECT 1 FROM utilizadores WHERE numero = $1),
                EXISTS (SELECT 1 FROM utilizadores WHERE lower(email) = lower($2))
            "#,
        )
        .bind(numero)
        .bind(email)
        .fetch_one(&self.pool)
        .await?;

        Ok(if numero_taken {
            Some("numero")
        } else if email_taken {
            Some("email")
        } else {
            None
        })
    }

    /// Insert a new active account
    pub async fn create_account(&self, account: &NewCrewAccount) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO utilizadores (numero, nome, email, cargo, password_hash, ativo)
            VALUES ($1, $2, $3, $4, $5, true)
            "#,
        )
        .bind(&account.numero)
        .bind(&account.nome)
        .bind(&account.email)
        .bind(account.cargo.as_str())
        .bind(&account.password_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Replace the password hash and revoke every open session of the account
    pub async fn update_password(&self, numero: &str, password_hash: &str) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE utilizadores SET password_hash = $1, updated_at = NOW() WHERE numero = $2",
        )
        .bind(password_hash)
        .bind(numero)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM sessoes WHERE numero = $1")
            .bind(numero)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Open a session and return the plain token with its expiry.
    /// Only the token hash is stored.
    pub async fn create_session(
        &self,
        numero: &str,
        ttl: Duration,
    ) -> Result<(String, DateTime<Utc>), StoreError> {
        let token = generate_token();
        let expires_at = Utc::now() + ttl;

        sqlx::query(
            r#"
            INSERT INTO sessoes (token_hash, numero, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(token_hash(&token))
        .bind(numero)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok((token, expires_at))
    }

    /// Resolve a bearer token into the crew member owning it
    pub async fn resolve_session(&self, token: &str) -> Result<Option<AuthenticatedCrew>, StoreError> {
        let row: Option<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT u.numero, u.nome, u.cargo
            FROM sessoes s
            JOIN utilizadores u ON u.numero = s.numero
            WHERE s.token_hash = $1 AND s.expires_at > NOW() AND u.ativo = true
            "#,
        )
        .bind(token_hash(token))
        .fetch_optional(&self.pool)
        .await?;

        row.map(|(numero, nome, cargo)| -> Result<_, StoreError> {
            Ok(AuthenticatedCrew {
                numero,
                nome,
                cargo: cargo.parse().map_err(StoreError::Corrupt)?,
            })
        })
        .transpose()
    }

    /// Close a session
    pub async fn delete_session(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessoes WHERE token_hash = $1")
            .bind(token_hash(token))
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
