/// Shared types used across the codebase

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Tenant identifiers are `bigint` in the Traffic Ops schema
pub type TenantId = i64;

/// Privilege levels carried by roles and users
pub mod priv_level {
    pub const READ_ONLY: i32 = 10;
    pub const OPERATIONS: i32 = 20;
    pub const ADMIN: i32 = 30;
}

/// A Traffic Ops API version, e.g. `4.0` or `1.3`. Serialized as its string form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion {
    pub major: u32,
    pub minor: u32,
}

impl ApiVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid API version '{0}', expected <major>.<minor>")]
pub struct ApiVersionParseError(pub String);

impl FromStr for ApiVersion {
    type Err = ApiVersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Route paths carry a leading 'v' in some clients
        let trimmed = s.trim().trim_start_matches('v');
        let (major, minor) = match trimmed.split_once('.') {
            Some((major, minor)) => (major, minor),
            None => (trimmed, "0"),
        };
        let major = major.parse().map_err(|_| ApiVersionParseError(s.to_string()))?;
        let minor = minor.parse().map_err(|_| ApiVersionParseError(s.to_string()))?;
        Ok(Self { major, minor })
    }
}

impl Serialize for ApiVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ApiVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_versions() {
        assert_eq!("4.0".parse::<ApiVersion>().unwrap(), ApiVersion::new(4, 0));
        assert_eq!("v3.1".parse::<ApiVersion>().unwrap(), ApiVersion::new(3, 1));
        assert_eq!("2".parse::<ApiVersion>().unwrap(), ApiVersion::new(2, 0));
        assert!("four".parse::<ApiVersion>().is_err());
        assert!("4.x".parse::<ApiVersion>().is_err());
    }

    #[test]
    fn orders_by_major_then_minor() {
        assert!(ApiVersion::new(1, 3) < ApiVersion::new(2, 0));
        assert!(ApiVersion::new(3, 1) < ApiVersion::new(4, 0));
        assert_eq!(ApiVersion::new(4, 0).to_string(), "4.0");
    }

    #[test]
    fn serializes_as_a_string() {
        assert_eq!(serde_json::to_value(ApiVersion::new(4, 0)).unwrap(), "4.0");
        let parsed: ApiVersion = serde_json::from_value(serde_json::json!("v3.1")).unwrap();
        assert_eq!(parsed, ApiVersion::new(3, 1));
        assert!(serde_json::from_value::<ApiVersion>(serde_json::json!({"major": 4, "minor": 0})).is_err());
    }
}
