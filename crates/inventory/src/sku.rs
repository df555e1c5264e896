use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, SkuId};

/// Static SKU reference data.
///
/// `default_units_per_carton` applies to ledger entries that do not carry a
/// batch-specific override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sku {
    pub id: SkuId,
    pub code: String,
    pub description: String,
    pub default_units_per_carton: u32,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSku {
    pub code: String,
    pub description: String,
    pub default_units_per_carton: u32,
}

impl NewSku {
    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("sku code cannot be empty"));
        }
        if self.default_units_per_carton == 0 {
            return Err(DomainError::validation(
                "default_units_per_carton must be greater than zero",
            ));
        }
        Ok(())
    }

    pub fn into_sku(self, id: SkuId, created_at: DateTime<Utc>) -> Sku {
        Sku {
            id,
            code: self.code.trim().to_string(),
            description: self.description,
            default_units_per_carton: self.default_units_per_carton,
            created_at,
        }
    }
}
