//! Service record store

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::storage::StoreError;

use super::{MonthFilter, NewServiceRecord, ServiceRecord, ServiceState};

/// Storage seam for service records
#[async_trait]
pub trait ServiceStore: Send + Sync {
    /// Insert a new record in the `Agendado` state
    async fn create(&self, record: NewServiceRecord) -> Result<ServiceRecord, StoreError>;

    /// A crew member's services ordered by date and start time
    async fn list(
        &self,
        crew_member_id: &str,
        month: Option<MonthFilter>,
    ) -> Result<Vec<ServiceRecord>, StoreError>;

    /// Delete a record if it belongs to the crew member
    async fn delete_owned(&self, id: i64, crew_member_id: &str) -> Result<bool, StoreError>;
}

// =========================================================================
// PostgreSQL
// =========================================================================

/// PostgreSQL-backed service record store (`servicos`)
#[derive(Debug, Clone)]
pub struct PgServiceStore {
    pool: PgPool,
}

impl PgServiceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRow {
    id: i64,
    tripulante_id: String,
    numero_servico: String,
    data: NaiveDate,
    hora_inicio: NaiveTime,
    hora_fim: NaiveTime,
    local_inicio: String,
    local_fim: String,
    numero_chapa: String,
    afetacao: String,
    estado: String,
    observacoes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ServiceRow> for ServiceRecord {
    type Error = StoreError;

    fn try_from(row: ServiceRow) -> Result<Self, Self::Error> {
        let state = row.estado.parse::<ServiceState>().map_err(StoreError::Corrupt)?;
        Ok(Self {
            id: row.id,
            crew_member_id: row.tripulante_id,
            service_number: row.numero_servico,
            date: row.data,
            start_time: row.hora_inicio,
            end_time: row.hora_fim,
            start_location: row.local_inicio,
            end_location: row.local_fim,
            vehicle_plate: row.numero_chapa,
            assignment: row.afetacao,
            state,
            notes: row.observacoes,
            created_at: row.created_at,
        })
    }
}

const SERVICE_COLUMNS: &str = "id, tripulante_id, numero_servico, data, hora_inicio, hora_fim, \
     local_inicio, local_fim, numero_chapa, afetacao, estado, observacoes, created_at";

#[async_trait]
impl ServiceStore for PgServiceStore {
    async fn create(&self, record: NewServiceRecord) -> Result<ServiceRecord, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO servicos
                (tripulante_id, numero_servico, data, hora_inicio, hora_fim, local_inicio,
                 local_fim, numero_chapa, afetacao, estado, observacoes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {SERVICE_COLUMNS}
            "#
        );

        let row: ServiceRow = sqlx::query_as(&sql)
            .bind(&record.crew_member_id)
            .bind(&record.service_number)
            .bind(record.date)
            .bind(record.start_time)
            .bind(record.end_time)
            .bind(&record.start_location)
            .bind(&record.end_location)
            .bind(&record.vehicle_plate)
            .bind(&record.assignment)
            .bind(ServiceState::Scheduled.as_str())
            .bind(record.notes())
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn list(
        &self,
        crew_member_id: &str,
        month: Option<MonthFilter>,
    ) -> Result<Vec<ServiceRecord>, StoreError> {
        let rows: Vec<ServiceRow> = match month {
            Some(filter) => {
                let (start, end) = filter.range();
                let sql = format!(
                    r#"
                    SELECT {SERVICE_COLUMNS}
                    FROM servicos
                    WHERE tripulante_id = $1 AND data >= $2 AND data < $3
                    ORDER BY data ASC, hora_inicio ASC
                    "#
                );
                sqlx::query_as(&sql)
                    .bind(crew_member_id)
                    .bind(start)
                    .bind(end)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                let sql = format!(
                    r#"
                    SELECT {SERVICE_COLUMNS}
                    FROM servicos
                    WHERE tripulante_id = $1
                    ORDER BY data ASC, hora_inicio ASC
                    "#
                );
                sqlx::query_as(&sql)
                    .bind(crew_member_id)
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(ServiceRecord::try_from).collect()
    }

    async fn delete_owned(&self, id: i64, crew_member_id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM servicos WHERE id = $1 AND tripulante_id = $2")
            .bind(id)
            .bind(crew_member_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =========================================================================
// In-memory
// =========================================================================

#[derive(Debug, Default)]
struct MemoryServices {
    next_id: i64,
    records: Vec<ServiceRecord>,
}

/// In-memory service record store
#[derive(Debug, Default)]
pub struct MemoryServiceStore {
    inner: Mutex<MemoryServices>,
}

impl MemoryServiceStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ServiceStore for MemoryServiceStore {
    async fn create(&self, record: NewServiceRecord) -> Result<ServiceRecord, StoreError> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;

        let notes = record.notes();
        let created = ServiceRecord {
            id: inner.next_id,
            crew_member_id: record.crew_member_id,
            service_number: record.service_number,
            date: record.date,
            start_time: record.start_time,
            end_time: record.end_time,
            start_location: record.start_location,
            end_location: record.end_location,
            vehicle_plate: record.vehicle_plate,
            assignment: record.assignment,
            state: ServiceState::Scheduled,
            notes: Some(notes),
            created_at: Utc::now(),
        };
        inner.records.push(created.clone());
        Ok(created)
    }

    async fn list(
        &self,
        crew_member_id: &str,
        month: Option<MonthFilter>,
    ) -> Result<Vec<ServiceRecord>, StoreError> {
        let inner = self.inner.lock().await;
        let mut records: Vec<ServiceRecord> = inner
            .records
            .iter()
            .filter(|r| r.crew_member_id == crew_member_id)
            .filter(|r| month.map_or(true, |m| m.contains(r.date)))
            .cloned()
            .collect();
        records.sort_by_key(|r| (r.date, r.start_time));
        Ok(records)
    }

    async fn delete_owned(&self, id: i64, crew_member_id: &str) -> Result<bool, StoreError> {
        let mut inner = self.inner.lock().await;
        let before = inner.records.len();
        inner
            .records
            .retain(|r| !(r.id == id && r.crew_member_id == crew_member_id));
        Ok(inner.records.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_record(crew: &str, date: (i32, u32, u32), hour: u32) -> NewServiceRecord {
        NewServiceRecord {
            crew_member_id: crew.into(),
            service_number: "A1".into(),
            date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(hour + 8, 0, 0).unwrap(),
            start_location: "Garagem".into(),
            end_location: "Terminal".into(),
            vehicle_plate: "545".into(),
            assignment: "12E".into(),
        }
    }

    #[tokio::test]
    async fn test_memory_create_assigns_ids_and_state() {
        let store = MemoryServiceStore::new();
        let a = store.create(new_record("18001", (2026, 3, 1), 7)).await.unwrap();
        let b = store.create(new_record("18001", (2026, 3, 2), 7)).await.unwrap();

        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
        assert_eq!(a.state, ServiceState::Scheduled);
        assert_eq!(a.notes.as_deref(), Some("Serviço: A1 | Chapa: 545 | Afetação: 12E"));
    }

    #[tokio::test]
    async fn test_memory_list_orders_and_filters() {
        let store = MemoryServiceStore::new();
        store.create(new_record("18001", (2026, 3, 2), 9)).await.unwrap();
        store.create(new_record("18001", (2026, 3, 2), 6)).await.unwrap();
        store.create(new_record("18001", (2026, 4, 1), 6)).await.unwrap();
        store.create(new_record("18003", (2026, 3, 1), 6)).await.unwrap();

        let all = store.list("18001", None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].start_time, NaiveTime::from_hms_opt(6, 0, 0).unwrap());

        let march = store
            .list("18001", Some(MonthFilter::new(3, 2026).unwrap()))
            .await
            .unwrap();
        assert_eq!(march.len(), 2);
    }

    #[tokio::test]
    async fn test_memory_delete_requires_owner() {
        let store = MemoryServiceStore::new();
        let record = store.create(new_record("18001", (2026, 3, 1), 7)).await.unwrap();

        assert!(!store.delete_owned(record.id, "18003").await.unwrap());
        assert!(store.delete_owned(record.id, "18001").await.unwrap());
        assert!(!store.delete_owned(record.id, "18001").await.unwrap());
    }
}
