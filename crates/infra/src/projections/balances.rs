//! Balance projection: ledger fold, cache rebuild and drift reconciliation.
//!
//! The ledger is the source of truth. The cache is a snapshot that may drift
//! (crashes between append and rebuild, manual edits); `rebuild()` recomputes
//! it from scratch and `reconcile()` reports the difference without writing.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

use wms_core::{DomainError, WarehouseId};
use wms_inventory::{aggregate, AggregationError, Balance, BalanceKey};

use crate::ledger_store::{BalanceScope, LedgerStore, StoreError};
use crate::read_model::BalanceCache;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),
}

/// Result of a cache rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RebuildOutcome {
    pub warehouse_id: Option<WarehouseId>,
    pub updated_count: usize,
    /// Rows with negative cartons (shipped more than received).
    pub needs_review: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriftKind {
    /// Key present in the ledger fold but absent from the cache.
    MissingInCache,
    /// Cached key with no ledger entries left in scope.
    StaleInCache,
    /// Key present in both with different quantities.
    Mismatch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DriftEntry {
    pub kind: DriftKind,
    pub key: BalanceKey,
    pub ledger: Option<Balance>,
    pub cached: Option<Balance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub checked: usize,
    pub drift_count: usize,
    pub drift: Vec<DriftEntry>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.drift_count == 0
    }
}

/// Ledger-backed balance projection over a [`LedgerStore`] and a [`BalanceCache`].
///
/// Clones share one rebuild lock: fold and replace run as a unit, so a
/// snapshot folded earlier can never overwrite one folded later.
#[derive(Debug, Clone)]
pub struct BalanceProjection<L, C> {
    ledger: L,
    cache: C,
    rebuild_lock: Arc<Mutex<()>>,
}

impl<L, C> BalanceProjection<L, C>
where
    L: LedgerStore,
    C: BalanceCache,
{
    pub fn new(ledger: L, cache: C) -> Self {
        Self {
            ledger,
            cache,
            rebuild_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Fold the ledger for `scope` on the fly.
    #[instrument(skip(self), err)]
    pub async fn from_ledger(&self, scope: &BalanceScope) -> Result<Vec<Balance>, ProjectionError> {
        let transactions = self.ledger.load_ledger(scope).await?;
        let skus = self.ledger.list_skus().await?;
        Ok(aggregate(&transactions, &skus)?)
    }

    /// Read the cached snapshot for `scope`.
    pub async fn from_cache(&self, scope: &BalanceScope) -> Result<Vec<Balance>, ProjectionError> {
        Ok(self.cache.list(scope).await?)
    }

    /// Recompute and overwrite cached balances for one warehouse, or all of
    /// them when `warehouse_id` is `None`.
    ///
    /// Idempotent. A failed write leaves the previous snapshot in place.
    #[instrument(skip(self), err)]
    pub async fn rebuild(
        &self,
        warehouse_id: Option<WarehouseId>,
    ) -> Result<RebuildOutcome, ProjectionError> {
        let scope = match warehouse_id {
            Some(id) => {
                if self.ledger.get_warehouse(id).await?.is_none() {
                    return Err(StoreError::from(DomainError::not_found(format!("warehouse {id}"))).into());
                }
                BalanceScope::warehouse(id)
            }
            None => BalanceScope::all(),
        };

        let _guard = self.rebuild_lock.lock().await;

        let balances = self.from_ledger(&scope).await?;
        let needs_review = balances.iter().filter(|b| b.needs_review()).count();
        if needs_review > 0 {
            warn!(needs_review, "rebuild produced negative balances");
        }

        let updated_count = self.cache.replace(warehouse_id, balances).await?;
        info!(?warehouse_id, updated_count, "balance cache rebuilt");

        Ok(RebuildOutcome {
            warehouse_id,
            updated_count,
            needs_review,
        })
    }

    /// Compare the cache against a fresh fold for `scope`. Never writes.
    #[instrument(skip(self), err)]
    pub async fn reconcile(&self, scope: &BalanceScope) -> Result<ReconcileReport, ProjectionError> {
        let ledger: BTreeMap<BalanceKey, Balance> = self
            .from_ledger(scope)
            .await?
            .into_iter()
            .map(|b| (b.key(), b))
            .collect();
        let mut cached: BTreeMap<BalanceKey, Balance> = self
            .cache
            .list(scope)
            .await?
            .into_iter()
            .map(|b| (b.key(), b))
            .collect();

        let checked = ledger.len();
        let mut drift = Vec::new();

        for (key, expected) in ledger {
            match cached.remove(&key) {
                None => drift.push(DriftEntry {
                    kind: DriftKind::MissingInCache,
                    key,
                    ledger: Some(expected),
                    cached: None,
                }),
                Some(actual) if !same_quantities(&expected, &actual) => drift.push(DriftEntry {
                    kind: DriftKind::Mismatch,
                    key,
                    ledger: Some(expected),
                    cached: Some(actual),
                }),
                Some(_) => {}
            }
        }

        drift.extend(cached.into_iter().map(|(key, actual)| DriftEntry {
            kind: DriftKind::StaleInCache,
            key,
            ledger: None,
            cached: Some(actual),
        }));
        drift.sort_by(|a, b| a.key.cmp(&b.key));

        let drift_count = drift.len();
        if drift_count > 0 {
            warn!(drift_count, "balance cache drift detected");
        }

        Ok(ReconcileReport {
            checked,
            drift_count,
            drift,
        })
    }
}

fn same_quantities(a: &Balance, b: &Balance) -> bool {
    a.current_cartons == b.current_cartons
        && a.current_units == b.current_units
        && a.current_pallets == b.current_pallets
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use wms_inventory::{NewSku, NewTransaction, NewWarehouse, Sku, TransactionType, Warehouse};

    use super::*;
    use crate::ledger_store::InMemoryLedgerStore;
    use crate::read_model::InMemoryBalanceCache;

    type Projection = BalanceProjection<Arc<InMemoryLedgerStore>, Arc<InMemoryBalanceCache>>;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, n, 9, 0, 0).unwrap()
    }

    fn setup() -> (Projection, Arc<InMemoryLedgerStore>, Arc<InMemoryBalanceCache>) {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let cache = Arc::new(InMemoryBalanceCache::new());
        let projection = BalanceProjection::new(ledger.clone(), cache.clone());
        (projection, ledger, cache)
    }

    async fn warehouse(ledger: &InMemoryLedgerStore, code: &str) -> Warehouse {
        ledger
            .create_warehouse(NewWarehouse {
                code: code.to_string(),
                name: format!("{code} warehouse"),
            })
            .await
            .unwrap()
    }

    async fn sku(ledger: &InMemoryLedgerStore, code: &str, upc: u32) -> Sku {
        ledger
            .create_sku(NewSku {
                code: code.to_string(),
                description: code.to_string(),
                default_units_per_carton: upc,
            })
            .await
            .unwrap()
    }

    async fn record(
        ledger: &InMemoryLedgerStore,
        wh: &Warehouse,
        sku: &Sku,
        kind: TransactionType,
        cartons: i64,
        date: DateTime<Utc>,
    ) {
        let (cartons_in, cartons_out) = match kind {
            TransactionType::Receive => (cartons, 0),
            TransactionType::Ship => (0, cartons),
        };
        ledger
            .append_transaction(NewTransaction {
                transaction_type: kind,
                transaction_date: date,
                warehouse_id: wh.id,
                sku_id: sku.id,
                batch_lot: "B1".to_string(),
                cartons_in,
                cartons_out,
                pallets_in: 0,
                pallets_out: 0,
                units_per_carton: None,
                tracking_number: None,
                notes: None,
                created_by: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rebuild_persists_ledger_fold() {
        let (projection, ledger, _cache) = setup();
        let wh = warehouse(&ledger, "W1").await;
        let item = sku(&ledger, "S1", 10).await;
        record(&ledger, &wh, &item, TransactionType::Receive, 100, day(1)).await;
        record(&ledger, &wh, &item, TransactionType::Ship, 40, day(2)).await;

        let outcome = projection.rebuild(Some(wh.id)).await.unwrap();
        assert_eq!(outcome.updated_count, 1);
        assert_eq!(outcome.needs_review, 0);

        let cached = projection.from_cache(&BalanceScope::warehouse(wh.id)).await.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].current_cartons, 60);
        assert_eq!(cached[0].current_units, 600);
        assert_eq!(cached[0].first_receive_date, Some(day(1)));
        assert_eq!(cached[0].last_transaction_date, day(2));
    }

    #[tokio::test]
    async fn rebuild_is_idempotent() {
        let (projection, ledger, _cache) = setup();
        let wh = warehouse(&ledger, "W1").await;
        let item = sku(&ledger, "S1", 12).await;
        record(&ledger, &wh, &item, TransactionType::Receive, 5, day(1)).await;

        projection.rebuild(None).await.unwrap();
        let first = projection.from_cache(&BalanceScope::all()).await.unwrap();
        projection.rebuild(None).await.unwrap();
        let second = projection.from_cache(&BalanceScope::all()).await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn rebuild_of_empty_warehouse_writes_nothing() {
        let (projection, ledger, _cache) = setup();
        let wh = warehouse(&ledger, "EMPTY").await;

        let outcome = projection.rebuild(Some(wh.id)).await.unwrap();
        assert_eq!(outcome.updated_count, 0);
    }

    #[tokio::test]
    async fn rebuild_of_unknown_warehouse_is_not_found() {
        let (projection, _ledger, _cache) = setup();
        let err = projection.rebuild(Some(WarehouseId::new())).await.unwrap_err();
        assert!(matches!(
            err,
            ProjectionError::Store(StoreError::Domain(DomainError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn negative_balances_are_cached_and_counted() {
        let (projection, ledger, _cache) = setup();
        let wh = warehouse(&ledger, "W1").await;
        let item = sku(&ledger, "S1", 10).await;
        record(&ledger, &wh, &item, TransactionType::Ship, 3, day(1)).await;

        let outcome = projection.rebuild(None).await.unwrap();
        assert_eq!(outcome.needs_review, 1);

        let cached = projection.from_cache(&BalanceScope::all()).await.unwrap();
        assert_eq!(cached[0].current_cartons, -3);
    }

    /// Cache that records how many `replace` calls overlap.
    #[derive(Debug, Default)]
    struct OverlapCache {
        inner: InMemoryBalanceCache,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    #[async_trait]
    impl BalanceCache for OverlapCache {
        async fn list(&self, scope: &BalanceScope) -> Result<Vec<Balance>, StoreError> {
            self.inner.list(scope).await
        }

        async fn replace(
            &self,
            warehouse_id: Option<WarehouseId>,
            balances: Vec<Balance>,
        ) -> Result<usize, StoreError> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::task::yield_now().await;
            let written = self.inner.replace(warehouse_id, balances).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            written
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rebuilds_are_serialized() {
        let ledger = Arc::new(InMemoryLedgerStore::new());
        let cache = Arc::new(OverlapCache::default());
        let projection = BalanceProjection::new(ledger.clone(), cache.clone());
        let wh = warehouse(&ledger, "W1").await;
        let item = sku(&ledger, "S1", 10).await;
        record(&ledger, &wh, &item, TransactionType::Receive, 8, day(1)).await;

        let mut rebuilds = tokio::task::JoinSet::new();
        for i in 0..16 {
            let projection = projection.clone();
            let scope = if i % 2 == 0 { Some(wh.id) } else { None };
            rebuilds.spawn(async move { projection.rebuild(scope).await });
        }
        while let Some(joined) = rebuilds.join_next().await {
            assert_eq!(joined.unwrap().unwrap().updated_count, 1);
        }

        assert_eq!(cache.max_in_flight.load(Ordering::SeqCst), 1);
        assert!(projection.reconcile(&BalanceScope::all()).await.unwrap().is_clean());
    }

    #[tokio::test]
    async fn reconcile_reports_drift_until_rebuild() {
        let (projection, ledger, cache) = setup();
        let wh = warehouse(&ledger, "W1").await;
        let item = sku(&ledger, "S1", 10).await;
        let other = sku(&ledger, "S2", 10).await;
        record(&ledger, &wh, &item, TransactionType::Receive, 10, day(1)).await;
        projection.rebuild(None).await.unwrap();

        // New movement after the snapshot: existing key drifts, new key is missing.
        record(&ledger, &wh, &item, TransactionType::Ship, 4, day(2)).await;
        record(&ledger, &wh, &other, TransactionType::Receive, 1, day(2)).await;

        // Orphan cache row with no ledger entries behind it.
        let mut stale = projection.from_ledger(&BalanceScope::all()).await.unwrap()[0].clone();
        stale.batch_lot = "GHOST".to_string();
        let mut snapshot = cache.list(&BalanceScope::all()).await.unwrap();
        snapshot.push(stale);
        cache.replace(None, snapshot).await.unwrap();

        let report = projection.reconcile(&BalanceScope::all()).await.unwrap();
        assert_eq!(report.checked, 2);
        assert_eq!(report.drift_count, 3);
        let kinds: Vec<DriftKind> = report.drift.iter().map(|d| d.kind).collect();
        assert!(kinds.contains(&DriftKind::Mismatch));
        assert!(kinds.contains(&DriftKind::MissingInCache));
        assert!(kinds.contains(&DriftKind::StaleInCache));

        projection.rebuild(None).await.unwrap();
        let clean = projection.reconcile(&BalanceScope::all()).await.unwrap();
        assert!(clean.is_clean());
    }
}
