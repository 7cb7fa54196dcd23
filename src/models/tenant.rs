use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::convert::{ConversionError, Downgrade, Upgrade};
use crate::types::TenantId;

/// A node of the tenant tree as stored in the `tenant` table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Tenant {
    pub id: TenantId,
    pub name: String,
    pub active: bool,
    pub parent_id: Option<TenantId>,
    pub last_updated: DateTime<Utc>,
}

impl Tenant {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

/// One link of a user's ancestor chain, as reported by administrative listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantAncestor {
    pub id: TenantId,
    pub active: bool,
    pub name: String,
}

impl From<&Tenant> for TenantAncestor {
    fn from(tenant: &Tenant) -> Self {
        Self {
            id: tenant.id,
            active: tenant.active,
            name: tenant.name.clone(),
        }
    }
}

/// Tenant as it appears in API versions before 4.0: every field optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TenantNullable {
    pub id: Option<TenantId>,
    pub name: Option<String>,
    pub active: Option<bool>,
    pub parent_id: Option<TenantId>,
    #[sqlx(default)]
    pub parent_name: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl Downgrade for Tenant {
    type Legacy = TenantNullable;

    fn downgrade(&self) -> Result<TenantNullable, ConversionError> {
        Ok(TenantNullable {
            id: Some(self.id),
            name: Some(self.name.clone()),
            active: Some(self.active),
            parent_id: self.parent_id,
            parent_name: None,
            last_updated: Some(self.last_updated),
        })
    }
}

impl Upgrade for TenantNullable {
    type Current = Tenant;

    fn upgrade(&self) -> Result<Tenant, ConversionError> {
        Ok(Tenant {
            id: self.id.unwrap_or_default(),
            name: self.name.clone().unwrap_or_default(),
            active: self.active.unwrap_or_default(),
            parent_id: self.parent_id,
            last_updated: self.last_updated.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_then_upgrade_is_identity() {
        let tenant = Tenant {
            id: 7,
            name: "cdn-east".into(),
            active: false,
            parent_id: Some(1),
            last_updated: Utc::now(),
        };
        let legacy = tenant.downgrade().unwrap();
        assert_eq!(legacy.parent_id, Some(1));
        assert_eq!(legacy.active, Some(false));
        assert_eq!(legacy.upgrade().unwrap(), tenant);
    }

    #[test]
    fn upgrade_fills_absent_fields_with_defaults() {
        let upgraded = TenantNullable {
            name: Some("root".into()),
            ..Default::default()
        }
        .upgrade()
        .unwrap();

        assert_eq!(upgraded.name, "root");
        assert_eq!(upgraded.id, 0);
        assert!(!upgraded.active);
        assert!(upgraded.is_root());
        assert_eq!(upgraded.last_updated, DateTime::<Utc>::default());
    }
}
