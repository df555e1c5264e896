//! Append-only inventory ledger plus its reference data (warehouses, SKUs).
//!
//! The ledger is the single source of truth for stock. Balances are derived
//! from it (see [`crate::projections::balances`]).

pub mod in_memory;
pub mod postgres;
pub mod query;
pub mod r#trait;

pub use in_memory::InMemoryLedgerStore;
pub use postgres::PostgresLedgerStore;
pub use query::{BalanceScope, Pagination, TransactionFilter, TransactionPage};
pub use r#trait::{LedgerStore, StoreError};
