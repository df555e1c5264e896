//! Inventory domain module (ledger-based).
//!
//! This crate contains the business rules for the inventory ledger, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage). The
//! transaction log is the source of truth; balances are a fold over it.

pub mod balance;
pub mod sku;
pub mod transaction;
pub mod warehouse;

pub use balance::{
    aggregate, AggregationError, Balance, BalanceKey, BalanceSummary, InventoryStatus,
    UnitsPerCartonLookup,
};
pub use sku::{NewSku, Sku};
pub use transaction::{NewTransaction, Transaction, TransactionMetadataPatch, TransactionType};
pub use warehouse::{NewWarehouse, Warehouse};
