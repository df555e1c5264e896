//! Filters and pagination for ledger reads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{SkuId, WarehouseId};
use wms_inventory::{Transaction, TransactionType};

/// Pagination parameters for ledger listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub limit: u32,
    pub offset: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: 50,
            offset: 0,
        }
    }
}

impl Pagination {
    pub const MAX_LIMIT: u32 = 1000;

    pub fn new(limit: Option<u32>, offset: Option<u32>) -> Self {
        Self {
            limit: limit.unwrap_or(50).clamp(1, Self::MAX_LIMIT),
            offset: offset.unwrap_or(0),
        }
    }
}

/// Filter criteria for ledger listings. Empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub warehouse_id: Option<WarehouseId>,
    pub sku_id: Option<SkuId>,
    pub batch_lot: Option<String>,
    pub transaction_type: Option<TransactionType>,
    /// Inclusive lower bound on `transaction_date`.
    pub from: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `transaction_date`.
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.warehouse_id.is_none_or(|w| tx.warehouse_id == w)
            && self.sku_id.is_none_or(|s| tx.sku_id == s)
            && self.batch_lot.as_deref().is_none_or(|b| tx.batch_lot == b)
            && self.transaction_type.is_none_or(|t| tx.transaction_type == t)
            && self.from.is_none_or(|from| tx.transaction_date >= from)
            && self.to.is_none_or(|to| tx.transaction_date < to)
    }
}

/// One page of ledger entries, most recent first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Total entries matching the filter (across all pages).
    pub total: u64,
    pub pagination: Pagination,
    pub has_more: bool,
}

/// Which slice of the ledger a balance read or rebuild covers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceScope {
    /// `None` means all warehouses.
    pub warehouse_id: Option<WarehouseId>,
    pub sku_id: Option<SkuId>,
}

impl BalanceScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn warehouse(warehouse_id: WarehouseId) -> Self {
        Self {
            warehouse_id: Some(warehouse_id),
            sku_id: None,
        }
    }

    pub fn contains(&self, warehouse_id: WarehouseId, sku_id: SkuId) -> bool {
        self.warehouse_id.is_none_or(|w| w == warehouse_id)
            && self.sku_id.is_none_or(|s| s == sku_id)
    }
}
