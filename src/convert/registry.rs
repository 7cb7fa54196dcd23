use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::convert::ConversionError;
use crate::types::ApiVersion;

/// Versioned resource types known to the converter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Role,
    Server,
    #[serde(rename = "dsr")]
    DeliveryServiceRequest,
    Parameter,
    Tenant,
}

impl EntityKind {
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Role,
        EntityKind::Server,
        EntityKind::DeliveryServiceRequest,
        EntityKind::Parameter,
        EntityKind::Tenant,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Role => "role",
            EntityKind::Server => "server",
            EntityKind::DeliveryServiceRequest => "dsr",
            EntityKind::Parameter => "parameter",
            EntityKind::Tenant => "tenant",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "role" | "roles" => Ok(EntityKind::Role),
            "server" | "servers" => Ok(EntityKind::Server),
            "dsr" | "deliveryservice_request" | "deliveryservice_requests" => {
                Ok(EntityKind::DeliveryServiceRequest)
            }
            "parameter" | "parameters" => Ok(EntityKind::Parameter),
            "tenant" | "tenants" => Ok(EntityKind::Tenant),
            other => Err(format!("unknown entity kind '{}'", other)),
        }
    }
}

/// A concrete wire structure. Each maps to one Rust type under `crate::models`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    RoleV11,
    Role,
    RoleV4,
    ServerNullableV2,
    ServerV40,
    DeliveryServiceRequestNullable,
    DeliveryServiceRequestV40,
    ParameterNullable,
    Parameter,
    TenantNullable,
    Tenant,
}

/// Half-open version range `[since, until)` in which `shape` is the wire form of `kind`
#[derive(Debug, Clone, Copy)]
pub struct Registration {
    pub kind: EntityKind,
    pub since: ApiVersion,
    pub until: ApiVersion,
    pub shape: Shape,
}

impl Registration {
    const fn new(kind: EntityKind, since: (u32, u32), until: (u32, u32), shape: Shape) -> Self {
        Self {
            kind,
            since: ApiVersion::new(since.0, since.1),
            until: ApiVersion::new(until.0, until.1),
            shape,
        }
    }

    pub fn covers(&self, version: ApiVersion) -> bool {
        self.since <= version && version < self.until
    }
}

/// Every shape the API has served, built once and read-only afterwards.
///
/// Per kind, entries are listed oldest first; the last one is the latest shape.
pub static REGISTRY: Lazy<Vec<Registration>> = Lazy::new(|| {
    use EntityKind::*;
    vec![
        Registration::new(Role, (1, 1), (1, 3), Shape::RoleV11),
        Registration::new(Role, (1, 3), (4, 0), Shape::Role),
        Registration::new(Role, (4, 0), (5, 0), Shape::RoleV4),
        Registration::new(Server, (1, 1), (3, 0), Shape::ServerNullableV2),
        Registration::new(Server, (3, 0), (5, 0), Shape::ServerV40),
        Registration::new(DeliveryServiceRequest, (1, 1), (4, 0), Shape::DeliveryServiceRequestNullable),
        Registration::new(DeliveryServiceRequest, (4, 0), (5, 0), Shape::DeliveryServiceRequestV40),
        Registration::new(Parameter, (1, 1), (4, 0), Shape::ParameterNullable),
        Registration::new(Parameter, (4, 0), (5, 0), Shape::Parameter),
        Registration::new(Tenant, (1, 1), (4, 0), Shape::TenantNullable),
        Registration::new(Tenant, (4, 0), (5, 0), Shape::Tenant),
    ]
});

/// Shape used for `kind` in API `version`
pub fn shape_for(kind: EntityKind, version: ApiVersion) -> Result<Shape, ConversionError> {
    REGISTRY
        .iter()
        .find(|r| r.kind == kind && r.covers(version))
        .map(|r| r.shape)
        .ok_or(ConversionError::UnsupportedVersion { kind, version })
}

/// Registered shapes for `kind`, oldest first
pub fn shapes_of(kind: EntityKind) -> impl Iterator<Item = &'static Registration> {
    REGISTRY.iter().filter(move |r| r.kind == kind)
}
