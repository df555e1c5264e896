use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use wms_core::{DomainError, SkuId, TransactionId, WarehouseId};
use wms_inventory::{
    NewSku, NewTransaction, NewWarehouse, Sku, Transaction, TransactionMetadataPatch, Warehouse,
};

use super::query::{BalanceScope, Pagination, TransactionFilter, TransactionPage};
use super::r#trait::{LedgerStore, StoreError};

#[derive(Debug, Default)]
struct State {
    warehouses: BTreeMap<WarehouseId, Warehouse>,
    skus: BTreeMap<SkuId, Sku>,
    /// Append-only, in sequence order.
    transactions: Vec<Transaction>,
    last_sequence: i64,
}

/// In-memory ledger store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryLedgerStore {
    state: RwLock<State>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn create_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, StoreError> {
        new.validate()?;
        let mut state = self.write()?;

        let code = new.code.trim();
        if state.warehouses.values().any(|w| w.code == code) {
            return Err(DomainError::conflict(format!("warehouse code '{code}' already exists")).into());
        }

        let warehouse = new.into_warehouse(WarehouseId::new(), Utc::now());
        state.warehouses.insert(warehouse.id, warehouse.clone());
        Ok(warehouse)
    }

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        Ok(self.read()?.warehouses.get(&id).cloned())
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        let mut out: Vec<Warehouse> = self.read()?.warehouses.values().cloned().collect();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(out)
    }

    async fn create_sku(&self, new: NewSku) -> Result<Sku, StoreError> {
        new.validate()?;
        let mut state = self.write()?;

        let code = new.code.trim();
        if state.skus.values().any(|s| s.code == code) {
            return Err(DomainError::conflict(format!("sku code '{code}' already exists")).into());
        }

        let sku = new.into_sku(SkuId::new(), Utc::now());
        state.skus.insert(sku.id, sku.clone());
        Ok(sku)
    }

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError> {
        Ok(self.read()?.skus.get(&id).cloned())
    }

    async fn list_skus(&self) -> Result<Vec<Sku>, StoreError> {
        let mut out: Vec<Sku> = self.read()?.skus.values().cloned().collect();
        out.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(out)
    }

    async fn append_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        new.validate()?;
        let mut state = self.write()?;

        if !state.warehouses.contains_key(&new.warehouse_id) {
            return Err(DomainError::not_found(format!("warehouse {}", new.warehouse_id)).into());
        }
        if !state.skus.contains_key(&new.sku_id) {
            return Err(DomainError::not_found(format!("sku {}", new.sku_id)).into());
        }

        state.last_sequence += 1;
        let tx = new.into_transaction(TransactionId::new(), state.last_sequence, Utc::now());
        state.transactions.push(tx.clone());
        Ok(tx)
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        Ok(self.read()?.transactions.iter().find(|t| t.id == id).cloned())
    }

    async fn patch_transaction(
        &self,
        id: TransactionId,
        patch: TransactionMetadataPatch,
    ) -> Result<Transaction, StoreError> {
        let mut state = self.write()?;
        let tx = state
            .transactions
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| DomainError::not_found(format!("transaction {id}")))?;

        patch.apply_to(tx);
        Ok(tx.clone())
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> Result<TransactionPage, StoreError> {
        let state = self.read()?;

        let mut matching: Vec<&Transaction> =
            state.transactions.iter().filter(|t| filter.matches(t)).collect();
        matching.sort_by_key(|t| std::cmp::Reverse(t.replay_order()));

        let total = matching.len() as u64;
        let transactions: Vec<Transaction> = matching
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .cloned()
            .collect();
        let has_more = u64::from(pagination.offset) + (transactions.len() as u64) < total;

        Ok(TransactionPage {
            transactions,
            total,
            pagination,
            has_more,
        })
    }

    async fn load_ledger(&self, scope: &BalanceScope) -> Result<Vec<Transaction>, StoreError> {
        let state = self.read()?;
        let mut out: Vec<Transaction> = state
            .transactions
            .iter()
            .filter(|t| scope.contains(t.warehouse_id, t.sku_id))
            .cloned()
            .collect();
        out.sort_by_key(|t| t.replay_order());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};
    use wms_inventory::TransactionType;

    fn day(n: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, n, 12, 0, 0).unwrap()
    }

    async fn seeded() -> (InMemoryLedgerStore, Warehouse, Sku) {
        let store = InMemoryLedgerStore::new();
        let wh = store
            .create_warehouse(NewWarehouse {
                code: "MAIN".to_string(),
                name: "Main warehouse".to_string(),
            })
            .await
            .unwrap();
        let sku = store
            .create_sku(NewSku {
                code: "WID-1".to_string(),
                description: "Widget".to_string(),
                default_units_per_carton: 10,
            })
            .await
            .unwrap();
        (store, wh, sku)
    }

    fn movement(wh: &Warehouse, sku: &Sku, kind: TransactionType, cartons: i64, date: DateTime<Utc>) -> NewTransaction {
        let (cartons_in, cartons_out) = match kind {
            TransactionType::Receive => (cartons, 0),
            TransactionType::Ship => (0, cartons),
        };
        NewTransaction {
            transaction_type: kind,
            transaction_date: date,
            warehouse_id: wh.id,
            sku_id: sku.id,
            batch_lot: "LOT-1".to_string(),
            cartons_in,
            cartons_out,
            pallets_in: 0,
            pallets_out: 0,
            units_per_carton: None,
            tracking_number: None,
            notes: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn duplicate_codes_conflict() {
        let (store, _wh, _sku) = seeded().await;
        let err = store
            .create_sku(NewSku {
                code: "WID-1".to_string(),
                description: "dup".to_string(),
                default_units_per_carton: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test]
    async fn append_assigns_increasing_sequence_and_checks_references() {
        let (store, wh, sku) = seeded().await;

        let a = store
            .append_transaction(movement(&wh, &sku, TransactionType::Receive, 5, day(2)))
            .await
            .unwrap();
        let b = store
            .append_transaction(movement(&wh, &sku, TransactionType::Ship, 2, day(1)))
            .await
            .unwrap();
        assert!(b.sequence > a.sequence);

        let mut orphan = movement(&wh, &sku, TransactionType::Receive, 1, day(1));
        orphan.sku_id = SkuId::new();
        let err = store.append_transaction(orphan).await.unwrap_err();
        assert!(matches!(err, StoreError::Domain(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn ledger_loads_in_replay_order_and_listing_is_recent_first() {
        let (store, wh, sku) = seeded().await;
        for (kind, qty, d) in [
            (TransactionType::Receive, 10, day(3)),
            (TransactionType::Receive, 4, day(1)),
            (TransactionType::Ship, 3, day(2)),
        ] {
            store.append_transaction(movement(&wh, &sku, kind, qty, d)).await.unwrap();
        }

        let ledger = store.load_ledger(&BalanceScope::all()).await.unwrap();
        let dates: Vec<_> = ledger.iter().map(|t| t.transaction_date).collect();
        assert_eq!(dates, vec![day(1), day(2), day(3)]);

        let page = store
            .query_transactions(&TransactionFilter::default(), Pagination::new(Some(2), None))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        assert!(page.has_more);
        assert_eq!(page.transactions[0].transaction_date, day(3));

        let ships = store
            .query_transactions(
                &TransactionFilter {
                    transaction_type: Some(TransactionType::Ship),
                    ..TransactionFilter::default()
                },
                Pagination::default(),
            )
            .await
            .unwrap();
        assert_eq!(ships.total, 1);
        assert!(!ships.has_more);
    }

    #[tokio::test]
    async fn patch_updates_metadata_only() {
        let (store, wh, sku) = seeded().await;
        let tx = store
            .append_transaction(movement(&wh, &sku, TransactionType::Ship, 2, day(1)))
            .await
            .unwrap();

        let patched = store
            .patch_transaction(
                tx.id,
                TransactionMetadataPatch {
                    tracking_number: Some("TRK-42".to_string()),
                    notes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(patched.tracking_number.as_deref(), Some("TRK-42"));
        assert_eq!(patched.cartons_out, 2);
        assert_eq!(patched.sequence, tx.sequence);

        let missing = store
            .patch_transaction(TransactionId::new(), TransactionMetadataPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(missing, StoreError::Domain(DomainError::NotFound(_))));
    }
}
