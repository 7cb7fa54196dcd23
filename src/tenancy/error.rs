use thiserror::Error;

use crate::error::ErrorKind;
use crate::types::TenantId;

/// Failures reading the tenant tree
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    /// The tree violates its own invariants (a cycle, or deeper than the configured limit)
    #[error("tenant hierarchy is corrupt: {0}")]
    Corrupt(String),
}

/// Outcome of a failed tenancy check
#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("tenant store failure: {0}")]
    Store(#[from] StoreError),

    /// The acting user's own tenant is gone; the session no longer matches the database
    #[error("user tenant {0} does not exist")]
    UserTenantMissing(TenantId),

    #[error("Access to this resource is not authorized")]
    Forbidden {
        user_tenant_id: TenantId,
        resource_tenant_id: TenantId,
    },

    #[error("{resource} '{key}' not found")]
    ResourceNotFound { resource: &'static str, key: String },

    /// Lookup by xml id of a delivery service that does not exist
    #[error("no such deliveryservice: '{0}'")]
    NoSuchDeliveryService(String),

    /// A resource whose tenant must be known carries none
    #[error("{resource} '{key}' has no tenant")]
    TenantUnassigned { resource: &'static str, key: String },
}

impl TenancyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TenancyError::Store(_)
            | TenancyError::UserTenantMissing(_)
            | TenancyError::TenantUnassigned { .. } => ErrorKind::System,
            TenancyError::Forbidden { .. }
            | TenancyError::ResourceNotFound { .. }
            | TenancyError::NoSuchDeliveryService(_) => ErrorKind::User,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_error_kinds() {
        assert_eq!(TenancyError::UserTenantMissing(4).kind(), ErrorKind::System);
        assert_eq!(
            TenancyError::Store(StoreError::Corrupt("cycle at 3".into())).kind(),
            ErrorKind::System
        );
        assert_eq!(
            TenancyError::Forbidden { user_tenant_id: 1, resource_tenant_id: 2 }.kind(),
            ErrorKind::User
        );
        assert_eq!(
            TenancyError::ResourceNotFound { resource: "deliveryservice", key: "demo".into() }.kind(),
            ErrorKind::User
        );
        assert_eq!(TenancyError::NoSuchDeliveryService("demo".into()).kind(), ErrorKind::User);
        assert_eq!(
            TenancyError::TenantUnassigned { resource: "deliveryservice", key: "demo".into() }.kind(),
            ErrorKind::System
        );
    }
}
