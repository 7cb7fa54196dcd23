use thiserror::Error;

use crate::convert::registry::EntityKind;
use crate::error::ErrorKind;
use crate::types::ApiVersion;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    /// The target shape cannot be built at all from what the source carries
    #[error("cannot convert {entity}: missing {field}")]
    Structural {
        entity: &'static str,
        field: &'static str,
    },

    #[error("invalid {field} '{value}'")]
    InvalidField { field: &'static str, value: String },

    #[error("{kind} is not available in API version {version}")]
    UnsupportedVersion { kind: EntityKind, version: ApiVersion },

    #[error("malformed {kind} body: {reason}")]
    InvalidBody { kind: EntityKind, reason: String },

    #[error("failed to encode {kind}: {reason}")]
    Encode { kind: EntityKind, reason: String },
}

impl ConversionError {
    pub fn structural(entity: &'static str, field: &'static str) -> Self {
        ConversionError::Structural { entity, field }
    }

    pub fn invalid_field(field: &'static str, value: impl Into<String>) -> Self {
        ConversionError::InvalidField {
            field,
            value: value.into(),
        }
    }

    /// Everything except an encoding failure stems from the caller's input
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConversionError::Encode { .. } => ErrorKind::System,
            _ => ErrorKind::User,
        }
    }
}
