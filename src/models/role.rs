use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use thiserror::Error;

use crate::convert::{ConversionError, Downgrade, Upgrade};
use crate::error::ErrorKind;

/// Role as served by API 1.1 and 1.2
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleV11 {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub priv_level: Option<i32>,
}

/// Role as served by API 1.3 through 3.x, with its capability list.
///
/// `capabilities: None` (sent as `null`) and `Some(vec![])` are different requests:
/// the first leaves existing capabilities alone, the second clears them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Role {
    pub id: Option<i64>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub priv_level: Option<i32>,
    #[sqlx(default)]
    pub capabilities: Option<Vec<String>>,
}

/// Role as served by API 4.0 and later
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleV4 {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    pub permissions: Option<Vec<String>>,
}

impl fmt::Display for RoleV4 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("can not create a role with a higher priv level than your own")]
pub struct PrivLevelError {
    pub requested: i32,
    pub acting: i32,
}

impl PrivLevelError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::User
    }
}

impl Role {
    /// A user may only create or update roles at or below their own privilege level.
    /// A role with no level is left to field validation.
    pub fn check_priv_level(&self, acting_priv_level: i32) -> Result<(), PrivLevelError> {
        match self.priv_level {
            Some(requested) if requested > acting_priv_level => Err(PrivLevelError {
                requested,
                acting: acting_priv_level,
            }),
            _ => Ok(()),
        }
    }
}

impl Upgrade for RoleV11 {
    type Current = Role;

    fn upgrade(&self) -> Result<Role, ConversionError> {
        Ok(Role {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            priv_level: self.priv_level,
            capabilities: None,
        })
    }
}

impl Downgrade for Role {
    type Legacy = RoleV11;

    fn downgrade(&self) -> Result<RoleV11, ConversionError> {
        Ok(RoleV11 {
            id: self.id,
            name: self.name.clone(),
            description: self.description.clone(),
            priv_level: self.priv_level,
        })
    }
}

impl Upgrade for Role {
    type Current = RoleV4;

    fn upgrade(&self) -> Result<RoleV4, ConversionError> {
        Ok(RoleV4 {
            name: self.name.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            last_updated: DateTime::<Utc>::default(),
            permissions: self.capabilities.clone(),
        })
    }
}

impl Downgrade for RoleV4 {
    type Legacy = Role;

    /// id and privLevel have no 4.0 counterpart and come back unset
    fn downgrade(&self) -> Result<Role, ConversionError> {
        Ok(Role {
            id: None,
            name: Some(self.name.clone()),
            description: Some(self.description.clone()),
            priv_level: None,
            capabilities: self.permissions.clone(),
        })
    }
}
