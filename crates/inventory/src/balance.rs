//! Ledger fold: current balances per (warehouse, SKU, batch/lot).
//!
//! Balances are never a source of truth. They are recomputed by replaying the
//! transaction log in `(transaction_date, sequence)` order and summing signed
//! quantities. For every key:
//!
//! `current_cartons == Σ cartons_in − Σ cartons_out`
//!
//! Negative balances (shipments with no matching receipt) are preserved as-is
//! and surfaced through [`Balance::needs_review`].

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wms_core::{SkuId, TransactionId, WarehouseId};

use crate::sku::Sku;
use crate::transaction::{Transaction, TransactionType};

/// Identity of a balance row.
///
/// Field order defines the deterministic output order of [`aggregate`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    pub warehouse_id: WarehouseId,
    pub sku_id: SkuId,
    pub batch_lot: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InventoryStatus {
    InStock,
    OutOfStock,
}

impl InventoryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryStatus::InStock => "IN_STOCK",
            InventoryStatus::OutOfStock => "OUT_OF_STOCK",
        }
    }
}

/// Derived balance for one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub warehouse_id: WarehouseId,
    pub sku_id: SkuId,
    pub batch_lot: String,
    pub current_cartons: i64,
    pub current_units: i64,
    pub current_pallets: i64,
    pub first_receive_date: Option<DateTime<Utc>>,
    pub last_transaction_date: DateTime<Utc>,
    /// The latest ledger entry in replay order; resolves same-date ties.
    pub last_transaction_id: TransactionId,
}

impl Balance {
    pub fn key(&self) -> BalanceKey {
        BalanceKey {
            warehouse_id: self.warehouse_id,
            sku_id: self.sku_id,
            batch_lot: self.batch_lot.clone(),
        }
    }

    pub fn inventory_status(&self) -> InventoryStatus {
        if self.current_cartons > 0 {
            InventoryStatus::InStock
        } else {
            InventoryStatus::OutOfStock
        }
    }

    /// Negative stock: shipped more than was ever received for this key.
    pub fn needs_review(&self) -> bool {
        self.current_cartons < 0
    }
}

/// Aggregate counts over a set of balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub distinct_skus: usize,
    /// Distinct (SKU, batch/lot) pairs.
    pub distinct_batches: usize,
    pub with_inventory: usize,
    pub out_of_stock: usize,
}

impl BalanceSummary {
    pub fn from_balances(balances: &[Balance]) -> Self {
        let skus: HashSet<SkuId> = balances.iter().map(|b| b.sku_id).collect();
        let batches: HashSet<(SkuId, &str)> = balances
            .iter()
            .map(|b| (b.sku_id, b.batch_lot.as_str()))
            .collect();
        let with_inventory = balances
            .iter()
            .filter(|b| b.inventory_status() == InventoryStatus::InStock)
            .count();

        Self {
            distinct_skus: skus.len(),
            distinct_batches: batches.len(),
            with_inventory,
            out_of_stock: balances.len() - with_inventory,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregationError {
    #[error("transaction {transaction_id} references sku {sku_id} with no units-per-carton default")]
    UnknownSku {
        transaction_id: TransactionId,
        sku_id: SkuId,
    },

    #[error("{field} total for sku {sku_id} batch '{batch_lot}' overflows at transaction {transaction_id}")]
    QuantityOverflow {
        field: &'static str,
        transaction_id: TransactionId,
        sku_id: SkuId,
        batch_lot: String,
    },
}

/// Source of SKU default units-per-carton.
pub trait UnitsPerCartonLookup {
    fn default_units_per_carton(&self, sku_id: SkuId) -> Option<u32>;
}

impl UnitsPerCartonLookup for HashMap<SkuId, u32> {
    fn default_units_per_carton(&self, sku_id: SkuId) -> Option<u32> {
        self.get(&sku_id).copied()
    }
}

impl UnitsPerCartonLookup for [Sku] {
    fn default_units_per_carton(&self, sku_id: SkuId) -> Option<u32> {
        self.iter()
            .find(|s| s.id == sku_id)
            .map(|s| s.default_units_per_carton)
    }
}

impl UnitsPerCartonLookup for Vec<Sku> {
    fn default_units_per_carton(&self, sku_id: SkuId) -> Option<u32> {
        self.as_slice().default_units_per_carton(sku_id)
    }
}

#[derive(Debug)]
struct Running {
    cartons: i64,
    units: i64,
    pallets: i64,
    first_receive_date: Option<DateTime<Utc>>,
    last_transaction_date: DateTime<Utc>,
    last_transaction_id: TransactionId,
}

/// Fold ledger entries into one [`Balance`] per distinct key.
///
/// Input order does not matter: entries are replayed by
/// `(transaction_date, sequence)`. Output is sorted by [`BalanceKey`].
/// Zero and negative balances are kept. Totals that do not fit in `i64`
/// fail with [`AggregationError::QuantityOverflow`].
///
/// Units accumulate per entry as `carton_delta × units_per_carton`, using the
/// entry's own override when present. Mixed overrides within a batch therefore
/// produce unit totals that are not a multiple of any single factor.
pub fn aggregate<'a, I, L>(transactions: I, skus: &L) -> Result<Vec<Balance>, AggregationError>
where
    I: IntoIterator<Item = &'a Transaction>,
    L: UnitsPerCartonLookup + ?Sized,
{
    let mut ordered: Vec<&Transaction> = transactions.into_iter().collect();
    ordered.sort_by_key(|t| t.replay_order());

    let mut running: BTreeMap<BalanceKey, Running> = BTreeMap::new();

    for tx in ordered {
        let units_per_carton = match tx.units_per_carton {
            Some(v) => v,
            None => skus.default_units_per_carton(tx.sku_id).ok_or(
                AggregationError::UnknownSku {
                    transaction_id: tx.id,
                    sku_id: tx.sku_id,
                },
            )?,
        };

        let key = BalanceKey {
            warehouse_id: tx.warehouse_id,
            sku_id: tx.sku_id,
            batch_lot: tx.batch_lot.clone(),
        };

        let entry = running.entry(key).or_insert_with(|| Running {
            cartons: 0,
            units: 0,
            pallets: 0,
            first_receive_date: None,
            last_transaction_date: tx.transaction_date,
            last_transaction_id: tx.id,
        });

        let overflow = |field: &'static str| AggregationError::QuantityOverflow {
            field,
            transaction_id: tx.id,
            sku_id: tx.sku_id,
            batch_lot: tx.batch_lot.clone(),
        };

        let delta = tx.carton_delta();
        let units = delta
            .checked_mul(i64::from(units_per_carton))
            .ok_or_else(|| overflow("units"))?;
        entry.cartons = entry.cartons.checked_add(delta).ok_or_else(|| overflow("cartons"))?;
        entry.units = entry.units.checked_add(units).ok_or_else(|| overflow("units"))?;
        entry.pallets = entry
            .pallets
            .checked_add(tx.pallet_delta())
            .ok_or_else(|| overflow("pallets"))?;
        entry.last_transaction_date = tx.transaction_date;
        entry.last_transaction_id = tx.id;

        if tx.transaction_type == TransactionType::Receive && entry.first_receive_date.is_none() {
            entry.first_receive_date = Some(tx.transaction_date);
        }
    }

    Ok(running
        .into_iter()
        .map(|(key, r)| Balance {
            warehouse_id: key.warehouse_id,
            sku_id: key.sku_id,
            batch_lot: key.batch_lot,
            current_cartons: r.cartons,
            current_units: r.units,
            current_pallets: r.pallets,
            first_receive_date: r.first_receive_date,
            last_transaction_date: r.last_transaction_date,
            last_transaction_id: r.last_transaction_id,
        })
        .collect())
}
