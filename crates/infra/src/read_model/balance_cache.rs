use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use wms_core::WarehouseId;
use wms_inventory::{Balance, BalanceKey};

use crate::ledger_store::{BalanceScope, StoreError};

/// Materialized balance rows.
#[async_trait]
pub trait BalanceCache: Send + Sync {
    /// Cached rows within `scope`, ordered by key.
    async fn list(&self, scope: &BalanceScope) -> Result<Vec<Balance>, StoreError>;

    /// Atomically replace every row of one warehouse (or all rows when `None`)
    /// with `balances`. Readers observe either the old or the new snapshot.
    ///
    /// Returns the number of rows written.
    async fn replace(
        &self,
        warehouse_id: Option<WarehouseId>,
        balances: Vec<Balance>,
    ) -> Result<usize, StoreError>;
}

#[async_trait]
impl<S> BalanceCache for Arc<S>
where
    S: BalanceCache + ?Sized,
{
    async fn list(&self, scope: &BalanceScope) -> Result<Vec<Balance>, StoreError> {
        (**self).list(scope).await
    }

    async fn replace(
        &self,
        warehouse_id: Option<WarehouseId>,
        balances: Vec<Balance>,
    ) -> Result<usize, StoreError> {
        (**self).replace(warehouse_id, balances).await
    }
}

/// Reject a scoped replace that carries rows for another warehouse.
pub(crate) fn ensure_in_scope(
    warehouse_id: Option<WarehouseId>,
    balances: &[Balance],
) -> Result<(), StoreError> {
    if let Some(w) = warehouse_id {
        if let Some(stray) = balances.iter().find(|b| b.warehouse_id != w) {
            return Err(StoreError::Query(format!(
                "balance for warehouse {} outside replace scope {w}",
                stray.warehouse_id
            )));
        }
    }
    Ok(())
}

/// In-memory balance cache for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBalanceCache {
    inner: RwLock<BTreeMap<BalanceKey, Balance>>,
}

impl InMemoryBalanceCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BalanceCache for InMemoryBalanceCache {
    async fn list(&self, scope: &BalanceScope) -> Result<Vec<Balance>, StoreError> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        Ok(map
            .values()
            .filter(|b| scope.contains(b.warehouse_id, b.sku_id))
            .cloned()
            .collect())
    }

    async fn replace(
        &self,
        warehouse_id: Option<WarehouseId>,
        balances: Vec<Balance>,
    ) -> Result<usize, StoreError> {
        ensure_in_scope(warehouse_id, &balances)?;

        let written = balances.len();
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        match warehouse_id {
            Some(w) => map.retain(|k, _| k.warehouse_id != w),
            None => map.clear(),
        }
        map.extend(balances.into_iter().map(|b| (b.key(), b)));

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use wms_core::{SkuId, TransactionId};

    fn balance(warehouse_id: WarehouseId, batch: &str, cartons: i64) -> Balance {
        Balance {
            warehouse_id,
            sku_id: SkuId::new(),
            batch_lot: batch.to_string(),
            current_cartons: cartons,
            current_units: cartons * 10,
            current_pallets: 0,
            first_receive_date: None,
            last_transaction_date: Utc::now(),
            last_transaction_id: TransactionId::new(),
        }
    }

    #[tokio::test]
    async fn scoped_replace_leaves_other_warehouses_untouched() {
        let cache = InMemoryBalanceCache::new();
        let w1 = WarehouseId::new();
        let w2 = WarehouseId::new();

        cache
            .replace(None, vec![balance(w1, "A", 1), balance(w2, "B", 2)])
            .await
            .unwrap();

        let written = cache.replace(Some(w1), vec![balance(w1, "C", 3)]).await.unwrap();
        assert_eq!(written, 1);

        let all = cache.list(&BalanceScope::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|b| b.warehouse_id == w2 && b.batch_lot == "B"));
        assert!(all.iter().all(|b| b.batch_lot != "A"));
    }

    #[tokio::test]
    async fn replace_rejects_rows_outside_scope_without_touching_cache() {
        let cache = InMemoryBalanceCache::new();
        let w1 = WarehouseId::new();
        cache.replace(None, vec![balance(w1, "A", 1)]).await.unwrap();

        let err = cache
            .replace(Some(w1), vec![balance(WarehouseId::new(), "X", 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Query(_)));
        assert_eq!(cache.list(&BalanceScope::all()).await.unwrap().len(), 1);
    }
}
