//! Read-model builders over the inventory ledger.
//!
//! Projections are rebuildable: the cache they maintain can always be
//! reconstructed by replaying the ledger.

pub mod balances;

pub use balances::{
    BalanceProjection, DriftEntry, DriftKind, ProjectionError, RebuildOutcome, ReconcileReport,
};
