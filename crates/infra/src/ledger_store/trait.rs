use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use wms_core::{DomainError, SkuId, TransactionId, WarehouseId};
use wms_inventory::{
    NewSku, NewTransaction, NewWarehouse, Sku, Transaction, TransactionMetadataPatch, Warehouse,
};

use super::query::{BalanceScope, Pagination, TransactionFilter, TransactionPage};

/// Storage operation error.
///
/// Domain failures (validation, missing references, uniqueness) pass through
/// as [`DomainError`]; everything else is an infrastructure failure that the
/// caller surfaces as an internal error without retrying.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// The backing store could not be reached (pool closed, IO, timeouts).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("query failed: {0}")]
    Query(String),

    /// A persisted row failed boundary validation.
    #[error("corrupt row: {0}")]
    CorruptRow(String),
}

impl StoreError {
    pub fn is_domain(&self) -> bool {
        matches!(self, StoreError::Domain(_))
    }
}

/// Append-only inventory ledger with its reference data.
///
/// ## Append Semantics
///
/// `append_transaction()`:
/// - validates the entry shape ([`NewTransaction::validate`])
/// - rejects unknown warehouse / SKU references (`DomainError::NotFound`)
/// - assigns id, `sequence` (strictly increasing creation order) and `created_at`
///
/// Entries are never deleted; only metadata may change via `patch_transaction()`.
///
/// ## Load Semantics
///
/// `load_ledger()` returns every entry in scope in replay order
/// (`transaction_date`, then `sequence`). `query_transactions()` is the paginated,
/// most-recent-first listing used by the API.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn create_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, StoreError>;

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError>;

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError>;

    async fn create_sku(&self, new: NewSku) -> Result<Sku, StoreError>;

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError>;

    async fn list_skus(&self) -> Result<Vec<Sku>, StoreError>;

    async fn append_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError>;

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError>;

    /// Patch tracking number / notes. Quantities are immutable.
    async fn patch_transaction(
        &self,
        id: TransactionId,
        patch: TransactionMetadataPatch,
    ) -> Result<Transaction, StoreError>;

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> Result<TransactionPage, StoreError>;

    /// Full, unpaginated ledger for a scope in replay order.
    async fn load_ledger(&self, scope: &BalanceScope) -> Result<Vec<Transaction>, StoreError>;
}

#[async_trait]
impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    async fn create_warehouse(&self, new: NewWarehouse) -> Result<Warehouse, StoreError> {
        (**self).create_warehouse(new).await
    }

    async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, StoreError> {
        (**self).get_warehouse(id).await
    }

    async fn list_warehouses(&self) -> Result<Vec<Warehouse>, StoreError> {
        (**self).list_warehouses().await
    }

    async fn create_sku(&self, new: NewSku) -> Result<Sku, StoreError> {
        (**self).create_sku(new).await
    }

    async fn get_sku(&self, id: SkuId) -> Result<Option<Sku>, StoreError> {
        (**self).get_sku(id).await
    }

    async fn list_skus(&self) -> Result<Vec<Sku>, StoreError> {
        (**self).list_skus().await
    }

    async fn append_transaction(&self, new: NewTransaction) -> Result<Transaction, StoreError> {
        (**self).append_transaction(new).await
    }

    async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, StoreError> {
        (**self).get_transaction(id).await
    }

    async fn patch_transaction(
        &self,
        id: TransactionId,
        patch: TransactionMetadataPatch,
    ) -> Result<Transaction, StoreError> {
        (**self).patch_transaction(id, patch).await
    }

    async fn query_transactions(
        &self,
        filter: &TransactionFilter,
        pagination: Pagination,
    ) -> Result<TransactionPage, StoreError> {
        (**self).query_transactions(filter, pagination).await
    }

    async fn load_ledger(&self, scope: &BalanceScope) -> Result<Vec<Transaction>, StoreError> {
        (**self).load_ledger(scope).await
    }
}
