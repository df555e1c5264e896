use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "inventory.read").
/// The wildcard permission `"*"` means "allow all".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: Permission = Permission(Cow::Borrowed("*"));

    /// Read warehouses, SKUs, ledger entries and balances.
    pub const INVENTORY_READ: Permission = Permission(Cow::Borrowed("inventory.read"));
    /// Append ledger entries and patch their metadata.
    pub const TRANSACTIONS_RECORD: Permission =
        Permission(Cow::Borrowed("inventory.transactions.record"));
    /// Rebuild and reconcile the balance cache.
    pub const BALANCES_REBUILD: Permission =
        Permission(Cow::Borrowed("inventory.balances.rebuild"));
    pub const SKUS_WRITE: Permission = Permission(Cow::Borrowed("catalog.skus.write"));
    pub const WAREHOUSES_WRITE: Permission = Permission(Cow::Borrowed("warehouses.write"));

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == "*"
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
