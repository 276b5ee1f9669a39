//! Scheduled Jobs
//!
//! Background maintenance: expiring ordens de serviço, dropping dead
//! sessions and pruning old route observations.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::time::Duration;
use tokio::time::interval;

use crate::config::Config;

// =========================================================================
// Ordens de serviço expiry
// =========================================================================

/// Soft-delete every active notice whose validity has passed
pub async fn expire_ordens_servico(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query(
        r#"
        UPDATE ordens_servico
        SET ativo = false, removida_em = NOW()
        WHERE ativo = true AND expira_em <= NOW()
        "#,
    )
    .execute(pool)
    .await?;

    let rows_affected = result.rows_affected();

    if rows_affected > 0 {
        tracing::info!(rows_affected = rows_affected, "Expired ordens de serviço");
    }

    Ok(rows_affected)
}

// =========================================================================
// Session cleanup
// =========================================================================

/// Delete sessions past their expiry
pub async fn delete_expired_sessions(pool: &PgPool) -> Result<u64, JobError> {
    let result = sqlx::query("DELETE FROM sessoes WHERE expires_at < NOW()")
        .execute(pool)
        .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(rows_deleted = rows_deleted, "Deleted expired sessions");
    }

    Ok(rows_deleted)
}

// =========================================================================
// Observation pruning
// =========================================================================

/// Delete route observations older than `retention_hours`
pub async fn prune_old_observacoes(pool: &PgPool, retention_hours: i64) -> Result<u64, JobError> {
    let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);

    let result = sqlx::query("DELETE FROM observacoes WHERE timestamp < $1")
        .bind(cutoff)
        .execute(pool)
        .await?;

    let rows_deleted = result.rows_affected();

    if rows_deleted > 0 {
        tracing::info!(
            rows_deleted = rows_deleted,
            retention_hours = retention_hours,
            "Pruned old observations"
        );
    }

    Ok(rows_deleted)
}

// =========================================================================
// Job Scheduler
// =========================================================================

/// Configuration for job scheduler
#[derive(Debug, Clone)]
pub struct JobSchedulerConfig {
    /// Interval for the ordens expiry sweep (default: 1 minute)
    pub ordens_sweep_interval: Duration,
    /// Interval for session and observation cleanup (default: 1 hour)
    pub cleanup_interval: Duration,
    /// Age after which observations are pruned (default: 24 hours)
    pub observation_retention_hours: i64,
}

impl Default for JobSchedulerConfig {
    fn default() -> Self {
        Self {
            ordens_sweep_interval: Duration::from_secs(60),
            cleanup_interval: Duration::from_secs(3600),
            observation_retention_hours: 24,
        }
    }
}

impl From<&Config> for JobSchedulerConfig {
    fn from(config: &Config) -> Self {
        Self {
            ordens_sweep_interval: config.ordens_sweep_interval,
            cleanup_interval: config.session_cleanup_interval,
            observation_retention_hours: config.observation_retention_hours,
        }
    }
}

/// Job Scheduler - runs periodic maintenance tasks
pub struct JobScheduler {
    pool: PgPool,
    config: JobSchedulerConfig,
}

impl JobScheduler {
    /// Create a new job scheduler
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            config: JobSchedulerConfig::default(),
        }
    }

    /// Create with custom configuration
    pub fn with_config(pool: PgPool, config: JobSchedulerConfig) -> Self {
        Self { pool, config }
    }

    /// Start the job scheduler in the background
    /// Returns a handle that can be used to abort the scheduler
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.run().await;
        })
    }

    /// Run the scheduler loop
    async fn run(&self) {
        tracing::info!(
            ordens_sweep_secs = self.config.ordens_sweep_interval.as_secs(),
            cleanup_secs = self.config.cleanup_interval.as_secs(),
            "Job scheduler started"
        );

        let mut ordens_interval = interval(self.config.ordens_sweep_interval);
        let mut cleanup_interval = interval(self.config.cleanup_interval);

        loop {
            tokio::select! {
                _ = ordens_interval.tick() => {
                    if let Err(e) = expire_ordens_servico(&self.pool).await {
                        tracing::error!(error = %e, "Ordens expiry sweep failed");
                    }
                }
                _ = cleanup_interval.tick() => {
                    if let Err(e) = delete_expired_sessions(&self.pool).await {
                        tracing::error!(error = %e, "Session cleanup failed");
                    }
                    if let Err(e) = prune_old_observacoes(&self.pool, self.config.observation_retention_hours).await {
                        tracing::error!(error = %e, "Observation pruning failed");
                    }
                }
            }
        }
    }

    /// Run all maintenance jobs once (for manual trigger or testing)
    pub async fn run_all_once(&self) -> MaintenanceReport {
        let mut report = MaintenanceReport::default();

        match expire_ordens_servico(&self.pool).await {
            Ok(count) => report.ordens_expired = count,
            Err(e) => report.errors.push(format!("Ordens expiry: {}", e)),
        }

        match delete_expired_sessions(&self.pool).await {
            Ok(count) => report.sessions_deleted = count,
            Err(e) => report.errors.push(format!("Session cleanup: {}", e)),
        }

        match prune_old_observacoes(&self.pool, self.config.observation_retention_hours).await {
            Ok(count) => report.observations_pruned = count,
            Err(e) => report.errors.push(format!("Observation pruning: {}", e)),
        }

        report.completed_at = Utc::now();
        report
    }
}

/// Report from running maintenance jobs
#[derive(Debug, Clone, Default)]
pub struct MaintenanceReport {
    pub ordens_expired: u64,
    pub sessions_deleted: u64,
    pub observations_pruned: u64,
    pub errors: Vec<String>,
    pub completed_at: DateTime<Utc>,
}

impl MaintenanceReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Job execution errors
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

// =========================================================================
// Tests
// =========================================================================
