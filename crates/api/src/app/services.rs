use std::sync::Arc;

use anyhow::Result;

use wms_infra::db;
use wms_infra::ledger_store::{InMemoryLedgerStore, LedgerStore, PostgresLedgerStore};
use wms_infra::projections::BalanceProjection;
use wms_infra::read_model::{BalanceCache, InMemoryBalanceCache, PostgresBalanceCache};

use crate::config::ApiConfig;

pub type DynLedgerStore = Arc<dyn LedgerStore>;
pub type DynBalanceCache = Arc<dyn BalanceCache>;

/// Shared services injected into every handler via `Extension<Arc<AppServices>>`.
#[derive(Clone)]
pub struct AppServices {
    ledger: DynLedgerStore,
    balances: BalanceProjection<DynLedgerStore, DynBalanceCache>,
    backend: &'static str,
}

impl AppServices {
    pub fn new(ledger: DynLedgerStore, cache: DynBalanceCache, backend: &'static str) -> Self {
        Self {
            balances: BalanceProjection::new(ledger.clone(), cache),
            ledger,
            backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryLedgerStore::new()),
            Arc::new(InMemoryBalanceCache::new()),
            "in_memory",
        )
    }

    pub fn ledger(&self) -> &DynLedgerStore {
        &self.ledger
    }

    pub fn balances(&self) -> &BalanceProjection<DynLedgerStore, DynBalanceCache> {
        &self.balances
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Postgres-backed services when `DATABASE_URL` is configured, in-memory otherwise.
pub async fn build_services(config: &ApiConfig) -> Result<AppServices> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::info!("DATABASE_URL not set; using in-memory stores");
        return Ok(AppServices::in_memory());
    };

    let pool = db::connect(url, config.db_max_connections).await?;
    db::migrate(&pool).await?;
    tracing::info!(max_connections = config.db_max_connections, "connected to Postgres");

    Ok(AppServices::new(
        Arc::new(PostgresLedgerStore::new(pool.clone())),
        Arc::new(PostgresBalanceCache::new(pool)),
        "postgres",
    ))
}
