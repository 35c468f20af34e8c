//! mkp-db
//!
//! Postgres persistence for the catalog and the order ledger.
//!
//! Connection, migration and status helpers return `anyhow::Result`; they
//! are called from binaries. Catalog and order operations return
//! [`EngineError`] so callers see the same error classes as with the
//! in-memory engine. Driver failures surface as `EngineError::Storage`.

use anyhow::{Context, Result};
use mkp_schemas::EngineError;
use sqlx::{postgres::PgPoolOptions, PgPool};

mod items;
mod orders;

pub use items::{delete_item, get_item, insert_item, list_items, update_item};
pub use orders::{
    delete_order, find_orders_by_phone, get_order, list_orders, place_order, set_order_status,
};

pub const ENV_DB_URL: &str = "MKP_DATABASE_URL";

/// Connect to Postgres using `MKP_DATABASE_URL`.
pub async fn connect_from_env() -> Result<PgPool> {
    let url = std::env::var(ENV_DB_URL).with_context(|| format!("missing env var {ENV_DB_URL}"))?;
    connect(&url).await
}

pub async fn connect(url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_items_table: bool,
    pub has_orders_table: bool,
}

/// Connectivity plus schema presence.
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_items_table: table_exists(pool, "items").await?,
        has_orders_table: table_exists(pool, "orders").await?,
    })
}

async fn table_exists(pool: &PgPool, table: &str) -> Result<bool> {
    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema = 'public' and table_name = $1
        )
        "#,
    )
    .bind(table)
    .fetch_one(pool)
    .await
    .with_context(|| format!("status table-exists query failed for {table}"))?;
    Ok(exists)
}

pub(crate) fn storage(e: sqlx::Error) -> EngineError {
    EngineError::storage(e)
}
