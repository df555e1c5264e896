//! Infrastructure layer: ledger storage, balance cache, projections, Postgres wiring.

pub mod db;
pub mod ledger_store;
pub mod projections;
pub mod read_model;
