//! Database module
//!
//! Connectivity and schema checks. The schema itself lives in
//! `migrations/` as raw SQL.

use sqlx::PgPool;

/// Tables the server needs before it can accept traffic
pub const REQUIRED_TABLES: &[&str] = &[
    "utilizadores",
    "sessoes",
    "servicos",
    "servicos_historico",
    "gps_positions",
    "check_ins",
    "observacoes",
    "ordens_servico",
    "avarias",
];

/// Verify database connectivity
pub async fn verify_connection(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Check that every required table exists.
///
/// The history upsert relies on the unique `(tripulante_id, numero_servico)`
/// constraint, so its presence is checked too.
pub async fn check_schema(pool: &PgPool) -> Result<bool, sqlx::Error> {
    for table in REQUIRED_TABLES {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM information_schema.tables
                WHERE table_schema = 'public' AND table_name = $1
            )
            "#,
        )
        .bind(table)
        .fetch_one(pool)
        .await?;

        if !exists {
            tracing::error!("Required table '{}' does not exist", table);
            return Ok(false);
        }
    }

    let history_key: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1 FROM pg_indexes
            WHERE schemaname = 'public'
              AND tablename = 'servicos_historico'
              AND indexdef ILIKE 'CREATE UNIQUE INDEX%(tripulante_id, numero_servico)%'
        )
        "#,
    )
    .fetch_one(pool)
    .await?;

    if !history_key {
        tracing::error!(
            "servicos_historico is missing its unique (tripulante_id, numero_servico) key"
        );
        return Ok(false);
    }

    tracing::info!("Database schema verified ({} tables)", REQUIRED_TABLES.len());
    Ok(true)
}
