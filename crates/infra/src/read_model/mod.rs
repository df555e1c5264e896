//! Cached balance snapshot storage.
//!
//! The cache is disposable: every row must equal the ledger fold at rebuild
//! time, and a scope is only ever replaced as a whole.

pub mod balance_cache;
pub mod postgres;

pub use balance_cache::{BalanceCache, InMemoryBalanceCache};
pub use postgres::PostgresBalanceCache;
