use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, SkuId, TransactionId, UserId, WarehouseId};

/// Direction of a physical stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Receive,
    Ship,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Receive => "RECEIVE",
            TransactionType::Ship => "SHIP",
        }
    }

    pub fn parse(s: &str) -> DomainResult<Self> {
        match s {
            "RECEIVE" => Ok(TransactionType::Receive),
            "SHIP" => Ok(TransactionType::Ship),
            other => Err(DomainError::validation(format!(
                "unknown transaction type '{other}' (expected RECEIVE or SHIP)"
            ))),
        }
    }
}

impl core::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ledger entry: one immutable inventory movement.
///
/// Entries are:
/// - **append-only** (never deleted)
/// - **immutable** in their quantities; only `tracking_number` and `notes` may be patched
/// - **ordered** by `(transaction_date, sequence)` where `sequence` is the
///   store-assigned creation order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// Monotonically increasing creation order, assigned by the store.
    pub sequence: i64,
    pub transaction_type: TransactionType,
    /// Business date of the movement.
    pub transaction_date: DateTime<Utc>,
    pub warehouse_id: WarehouseId,
    pub sku_id: SkuId,
    pub batch_lot: String,
    pub cartons_in: i64,
    pub cartons_out: i64,
    pub pallets_in: i64,
    pub pallets_out: i64,
    /// Batch-specific units-per-carton snapshot; falls back to the SKU default.
    pub units_per_carton: Option<u32>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub created_by: Option<UserId>,
}

impl Transaction {
    /// Net carton movement (positive for receipts, negative for shipments).
    pub fn carton_delta(&self) -> i64 {
        self.cartons_in - self.cartons_out
    }

    pub fn pallet_delta(&self) -> i64 {
        self.pallets_in - self.pallets_out
    }

    /// Ordering key for ledger replay.
    pub fn replay_order(&self) -> (DateTime<Utc>, i64) {
        (self.transaction_date, self.sequence)
    }
}

/// A movement to be appended to the ledger (not yet assigned id/sequence).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub transaction_date: DateTime<Utc>,
    pub warehouse_id: WarehouseId,
    pub sku_id: SkuId,
    pub batch_lot: String,
    pub cartons_in: i64,
    pub cartons_out: i64,
    pub pallets_in: i64,
    pub pallets_out: i64,
    pub units_per_carton: Option<u32>,
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Option<UserId>,
}

impl NewTransaction {
    /// Validate shape and direction consistency.
    ///
    /// Reference existence (warehouse, SKU) is checked by the store, which owns
    /// that data.
    pub fn validate(&self) -> DomainResult<()> {
        if self.batch_lot.trim().is_empty() {
            return Err(DomainError::validation("batch_lot cannot be empty"));
        }
        for (field, value) in [
            ("cartons_in", self.cartons_in),
            ("cartons_out", self.cartons_out),
            ("pallets_in", self.pallets_in),
            ("pallets_out", self.pallets_out),
        ] {
            if value < 0 {
                return Err(DomainError::validation(format!("{field} cannot be negative")));
            }
        }
        if self.units_per_carton == Some(0) {
            return Err(DomainError::validation(
                "units_per_carton override must be greater than zero",
            ));
        }

        match self.transaction_type {
            TransactionType::Receive => {
                if self.cartons_in == 0 {
                    return Err(DomainError::validation("RECEIVE requires cartons_in > 0"));
                }
                if self.cartons_out != 0 || self.pallets_out != 0 {
                    return Err(DomainError::validation("RECEIVE cannot carry outbound quantities"));
                }
            }
            TransactionType::Ship => {
                if self.cartons_out == 0 {
                    return Err(DomainError::validation("SHIP requires cartons_out > 0"));
                }
                if self.cartons_in != 0 || self.pallets_in != 0 {
                    return Err(DomainError::validation("SHIP cannot carry inbound quantities"));
                }
            }
        }

        Ok(())
    }

    pub fn into_transaction(
        self,
        id: TransactionId,
        sequence: i64,
        created_at: DateTime<Utc>,
    ) -> Transaction {
        Transaction {
            id,
            sequence,
            transaction_type: self.transaction_type,
            transaction_date: self.transaction_date,
            warehouse_id: self.warehouse_id,
            sku_id: self.sku_id,
            batch_lot: self.batch_lot.trim().to_string(),
            cartons_in: self.cartons_in,
            cartons_out: self.cartons_out,
            pallets_in: self.pallets_in,
            pallets_out: self.pallets_out,
            units_per_carton: self.units_per_carton,
            tracking_number: self.tracking_number,
            notes: self.notes,
            created_at,
            created_by: self.created_by,
        }
    }
}

/// Metadata-only patch for a ledger entry. Quantities are never patchable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionMetadataPatch {
    pub tracking_number: Option<String>,
    pub notes: Option<String>,
}

impl TransactionMetadataPatch {
    pub fn is_empty(&self) -> bool {
        self.tracking_number.is_none() && self.notes.is_none()
    }

    pub fn apply_to(&self, transaction: &mut Transaction) {
        if let Some(tracking) = &self.tracking_number {
            transaction.tracking_number = Some(tracking.clone());
        }
        if let Some(notes) = &self.notes {
            transaction.notes = Some(notes.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receive(cartons: i64) -> NewTransaction {
        NewTransaction {
            transaction_type: TransactionType::Receive,
            transaction_date: Utc::now(),
            warehouse_id: WarehouseId::new(),
            sku_id: SkuId::new(),
            batch_lot: "LOT-1".to_string(),
            cartons_in: cartons,
            cartons_out: 0,
            pallets_in: 0,
            pallets_out: 0,
            units_per_carton: None,
            tracking_number: None,
            notes: None,
            created_by: None,
        }
    }

    #[test]
    fn receive_requires_inbound_cartons() {
        assert!(receive(10).validate().is_ok());
        assert!(matches!(receive(0).validate(), Err(DomainError::Validation(_))));
    }

    #[test]
    fn ship_cannot_carry_inbound_quantities() {
        let mut tx = receive(5);
        tx.transaction_type = TransactionType::Ship;
        tx.cartons_out = 5;
        assert!(matches!(tx.validate(), Err(DomainError::Validation(_))));

        tx.cartons_in = 0;
        assert!(tx.validate().is_ok());
    }

    #[test]
    fn blank_batch_and_zero_override_are_rejected() {
        let mut tx = receive(1);
        tx.batch_lot = "   ".to_string();
        assert!(tx.validate().is_err());

        let mut tx = receive(1);
        tx.units_per_carton = Some(0);
        assert!(tx.validate().is_err());
    }

    #[test]
    fn metadata_patch_leaves_quantities_untouched() {
        let mut tx = receive(7).into_transaction(TransactionId::new(), 1, Utc::now());
        let before = tx.clone();

        TransactionMetadataPatch {
            tracking_number: Some("1Z999".to_string()),
            notes: None,
        }
        .apply_to(&mut tx);

        assert_eq!(tx.tracking_number.as_deref(), Some("1Z999"));
        assert_eq!(tx.cartons_in, before.cartons_in);
        assert_eq!(tx.notes, before.notes);
    }

    #[test]
    fn transaction_type_uses_upper_case_names() {
        assert_eq!(TransactionType::Receive.to_string(), "RECEIVE");
        assert_eq!(TransactionType::parse("SHIP").unwrap(), TransactionType::Ship);
        assert!(TransactionType::parse("ship").is_err());
    }
}
