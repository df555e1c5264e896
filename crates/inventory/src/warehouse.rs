use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wms_core::{DomainError, DomainResult, WarehouseId};

/// A physical stocking location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warehouse {
    pub id: WarehouseId,
    /// Short unique code (e.g. "LDN-01").
    pub code: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a warehouse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewWarehouse {
    pub code: String,
    pub name: String,
}

impl NewWarehouse {
    pub fn validate(&self) -> DomainResult<()> {
        if self.code.trim().is_empty() {
            return Err(DomainError::validation("warehouse code cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("warehouse name cannot be empty"));
        }
        Ok(())
    }

    pub fn into_warehouse(self, id: WarehouseId, created_at: DateTime<Utc>) -> Warehouse {
        Warehouse {
            id,
            code: self.code.trim().to_string(),
            name: self.name.trim().to_string(),
            created_at,
        }
    }
}
