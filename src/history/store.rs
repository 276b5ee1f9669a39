//! History store
//!
//! The aggregate is reached through [`HistoryStore`] so the recorder does not
//! care whether it lives in PostgreSQL or in memory.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::storage::StoreError;

use super::{apply_submission, HistoryKey, HistorySubmission, ServiceFields, ServiceHistory};

/// Storage seam for the service history aggregate
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Fetch the aggregate for a pair
    async fn get(&self, key: &HistoryKey) -> Result<Option<ServiceHistory>, StoreError>;

    /// Fold a submission into the aggregate as one atomic write and return
    /// the resulting state
    async fn upsert(&self, submission: HistorySubmission) -> Result<ServiceHistory, StoreError>;

    /// Remove the aggregate for a pair, returning whether it existed
    async fn delete(&self, key: &HistoryKey) -> Result<bool, StoreError>;
}

// =========================================================================
// PostgreSQL
// =========================================================================

/// PostgreSQL-backed history store (`servicos_historico`)
#[derive(Debug, Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    tripulante_id: String,
    numero_servico: String,
    local_inicio: String,
    local_fim: String,
    hora_inicio: NaiveTime,
    hora_fim: NaiveTime,
    numero_chapa: String,
    afetacao: String,
    contagem: i32,
    edicoes_count: i32,
    ultima_edicao: DateTime<Utc>,
}

impl From<HistoryRow> for ServiceHistory {
    fn from(row: HistoryRow) -> Self {
        Self {
            key: HistoryKey::new(row.tripulante_id, row.numero_servico),
            fields: ServiceFields {
                start_location: row.local_inicio,
                end_location: row.local_fim,
                start_time: row.hora_inicio,
                end_time: row.hora_fim,
                vehicle_plate: row.numero_chapa,
                assignment: row.afetacao,
            },
            repeat_count: row.contagem,
            edit_count: row.edicoes_count,
            last_edited_at: row.ultima_edicao,
        }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn get(&self, key: &HistoryKey) -> Result<Option<ServiceHistory>, StoreError> {
        let row: Option<HistoryRow> = sqlx::query_as(
            r#"
            SELECT tripulante_id, numero_servico, local_inicio, local_fim, hora_inicio,
                   hora_fim, numero_chapa, afetacao, contagem, edicoes_count, ultima_edicao
            FROM servicos_historico
            WHERE tripulante_id = $1 AND numero_servico = $2
            "#,
        )
        .bind(&key.crew_member_id)
        .bind(&key.service_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(ServiceHistory::from))
    }

    async fn upsert(&self, submission: HistorySubmission) -> Result<ServiceHistory, StoreError> {
        // Every reference to servicos_historico.* in the update arm reads the
        // row as it was before this statement, so the threshold check sees
        // the pre-increment count.
        let row: HistoryRow = sqlx::query_as(
            r#"
            INSERT INTO servicos_historico
                (tripulante_id, numero_servico, local_inicio, local_fim, hora_inicio, hora_fim,
                 numero_chapa, afetacao, contagem, edicoes_count, ultima_edicao)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 1, 0, NOW())
            ON CONFLICT (tripulante_id, numero_servico)
            DO UPDATE SET
                local_inicio = EXCLUDED.local_inicio,
                local_fim = EXCLUDED.local_fim,
                hora_inicio = EXCLUDED.hora_inicio,
                hora_fim = EXCLUDED.hora_fim,
                numero_chapa = EXCLUDED.numero_chapa,
                afetacao = EXCLUDED.afetacao,
                contagem = servicos_historico.contagem + 1,
                edicoes_count = CASE
                    WHEN servicos_historico.contagem >= 3 AND (
                        servicos_historico.local_inicio IS DISTINCT FROM EXCLUDED.local_inicio OR
                        servicos_historico.local_fim IS DISTINCT FROM EXCLUDED.local_fim OR
                        servicos_historico.hora_inicio IS DISTINCT FROM EXCLUDED.hora_inicio OR
                        servicos_historico.hora_fim IS DISTINCT FROM EXCLUDED.hora_fim OR
                        servicos_historico.numero_chapa IS DISTINCT FROM EXCLUDED.numero_chapa OR
                        servicos_historico.afetacao IS DISTINCT FROM EXCLUDED.afetacao)
                    THEN servicos_historico.edicoes_count + 1
                    ELSE servicos_historico.edicoes_count
                END,
                ultima_edicao = NOW()
            RETURNING tripulante_id, numero_servico, local_inicio, local_fim, hora_inicio,
                      hora_fim, numero_chapa, afetacao, contagem, edicoes_count, ultima_edicao
            "#,
        )
        .bind(&submission.key.crew_member_id)
        .bind(&submission.key.service_number)
        .bind(&submission.fields.start_location)
        .bind(&submission.fields.end_location)
        .bind(submission.fields.start_time)
        .bind(submission.fields.end_time)
        .bind(&submission.fields.vehicle_plate)
        .bind(&submission.fields.assignment)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn delete(&self, key: &HistoryKey) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "DELETE FROM servicos_historico WHERE tripulante_id = $1 AND numero_servico = $2",
        )
        .bind(&key.crew_member_id)
        .bind(&key.service_number)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// In-memory
// =========================================================================

/// In-memory history store.
///
/// The lock is held across read, compute and write so concurrent upserts for
/// the same pair serialize the same way the SQL upsert does.
#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    rows: Mutex<HashMap<HistoryKey, ServiceHistory>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored aggregates
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn get(&self, key: &HistoryKey) -> Result<Option<ServiceHistory>, StoreError> {
        Ok(self.rows.lock().await.get(key).cloned())
    }

    async fn upsert(&self, submission: HistorySubmission) -> Result<ServiceHistory, StoreError> {
        let mut rows = self.rows.lock().await;
        let key = submission.key.clone();
        let next = apply_submission(rows.get(&key), submission, Utc::now());
        rows.insert(key, next.clone());
        Ok(next)
    }

    async fn delete(&self, key: &HistoryKey) -> Result<bool, StoreError> {
        Ok(self.rows.lock().await.remove(key).is_some())
    }
}
