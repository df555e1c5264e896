use std::collections::HashSet;

use thiserror::Error;

use crate::{Permission, Principal, Role};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorize a principal for one permission.
///
/// - No IO
/// - No panics
/// - No business logic (pure policy check)
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    let perms: HashSet<&str> = principal.permissions.iter().map(|p| p.as_str()).collect();

    if perms.contains(Permission::WILDCARD.as_str()) || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

/// Static role → permission policy.
///
/// - `admin`: everything (including balance rebuilds)
/// - `staff`: read + record ledger entries
/// - `viewer`: read only
///
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    if roles.contains(&Role::ADMIN) {
        return vec![Permission::WILDCARD];
    }

    let mut out: Vec<Permission> = Vec::new();
    let mut grant = |p: Permission| {
        if !out.contains(&p) {
            out.push(p);
        }
    };

    for role in roles {
        if *role == Role::STAFF {
            grant(Permission::INVENTORY_READ);
            grant(Permission::TRANSACTIONS_RECORD);
        } else if *role == Role::VIEWER {
            grant(Permission::INVENTORY_READ);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wms_core::UserId;

    #[test]
    fn admin_has_wildcard() {
        let p = Principal::new(UserId::new(), vec![Role::ADMIN]);
        assert!(authorize(&p, &Permission::BALANCES_REBUILD).is_ok());
        assert!(authorize(&p, &Permission::new("anything.at.all")).is_ok());
    }

    #[test]
    fn staff_cannot_rebuild_balances() {
        let p = Principal::new(UserId::new(), vec![Role::STAFF]);
        assert!(authorize(&p, &Permission::TRANSACTIONS_RECORD).is_ok());
        assert_eq!(
            authorize(&p, &Permission::BALANCES_REBUILD),
            Err(AuthzError::Forbidden("inventory.balances.rebuild".to_string()))
        );
    }

    #[test]
    fn viewer_is_read_only_and_unknown_roles_grant_nothing() {
        let p = Principal::new(UserId::new(), vec![Role::VIEWER]);
        assert!(authorize(&p, &Permission::INVENTORY_READ).is_ok());
        assert!(authorize(&p, &Permission::TRANSACTIONS_RECORD).is_err());

        let p = Principal::new(UserId::new(), vec![Role::new("auditor")]);
        assert!(p.permissions.is_empty());
        assert!(authorize(&p, &Permission::INVENTORY_READ).is_err());
    }

    #[test]
    fn overlapping_roles_do_not_duplicate_permissions() {
        let perms = permissions_for_roles(&[Role::STAFF, Role::VIEWER]);
        assert_eq!(perms.len(), 2);
    }
}
