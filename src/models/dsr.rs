use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::convert::{ConversionError, Downgrade, Upgrade};
use crate::error::ErrorKind;
use crate::models::delivery_service::DeliveryServiceNullable;

/// Where a delivery service request is in its review workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestStatus {
    Draft,
    Submitted,
    Rejected,
    Pending,
    Complete,
}

impl RequestStatus {
    pub const ALL: [RequestStatus; 5] = [
        RequestStatus::Draft,
        RequestStatus::Submitted,
        RequestStatus::Rejected,
        RequestStatus::Pending,
        RequestStatus::Complete,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Draft => "draft",
            RequestStatus::Submitted => "submitted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Pending => "pending",
            RequestStatus::Complete => "complete",
        }
    }

    /// Rejected and complete requests are closed
    pub fn is_closed(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Complete)
    }

    /// Whether a request in this status may move to `to`
    pub fn valid_transition(&self, to: RequestStatus) -> Result<(), RequestStatusError> {
        use RequestStatus::*;
        let allowed = match self {
            Rejected | Complete => return Err(RequestStatusError::Closed(*self)),
            Draft => matches!(to, Draft | Submitted),
            Submitted => true,
            Pending => matches!(to, Pending | Complete),
        };
        if allowed {
            Ok(())
        } else {
            Err(RequestStatusError::InvalidTransition { from: *self, to })
        }
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RequestStatus {
    type Err = RequestStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RequestStatusError::Unknown(s.to_string()))
    }
}

impl Serialize for RequestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for RequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestStatusError {
    #[error("{0} request cannot be changed")]
    Closed(RequestStatus),

    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: RequestStatus, to: RequestStatus },

    #[error("invalid Delivery Service Request status: '{0}'")]
    Unknown(String),
}

impl RequestStatusError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::User
    }
}

/// What a delivery service request asks to do with its delivery service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DsrChangeType {
    Create,
    Update,
    Delete,
}

impl DsrChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DsrChangeType::Create => "create",
            DsrChangeType::Update => "update",
            DsrChangeType::Delete => "delete",
        }
    }
}

impl fmt::Display for DsrChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid Delivery Service Request changeType: '{0}'")]
pub struct ChangeTypeError(pub String);

impl FromStr for DsrChangeType {
    type Err = ChangeTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "create" => Ok(DsrChangeType::Create),
            "update" => Ok(DsrChangeType::Update),
            "delete" => Ok(DsrChangeType::Delete),
            _ => Err(ChangeTypeError(s.to_string())),
        }
    }
}

impl Serialize for DsrChangeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DsrChangeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Delivery service request as served before API 4.0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceRequestNullable {
    pub assignee: Option<String>,
    pub assignee_id: Option<i64>,
    pub author: Option<String>,
    pub author_id: Option<i64>,
    pub change_type: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub delivery_service: Option<DeliveryServiceNullable>,
    pub id: Option<i64>,
    pub last_edited_by: Option<String>,
    pub last_edited_by_id: Option<i64>,
    pub last_updated: Option<DateTime<Utc>>,
    pub status: Option<RequestStatus>,
    #[serde(rename = "xmlId")]
    pub xml_id: Option<String>,
}

/// Delivery service request as served by API 4.0 and later.
///
/// `original` is the delivery service before the change (updates and deletes),
/// `requested` is what the author wants it to become (creates and updates).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceRequestV40 {
    pub assignee: Option<String>,
    pub assignee_id: Option<i64>,
    #[serde(default)]
    pub author: String,
    pub author_id: Option<i64>,
    pub change_type: Option<DsrChangeType>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    pub id: Option<i64>,
    #[serde(default)]
    pub last_edited_by: String,
    pub last_edited_by_id: Option<i64>,
    #[serde(default)]
    pub last_updated: DateTime<Utc>,
    pub original: Option<DeliveryServiceNullable>,
    pub requested: Option<DeliveryServiceNullable>,
    pub status: Option<RequestStatus>,
    #[serde(rename = "xmlId", default)]
    pub xml_id: String,
}

impl DeliveryServiceRequestV40 {
    /// The delivery service the request is about: the requested state when there
    /// is one, otherwise the original
    pub fn delivery_service(&self) -> Option<&DeliveryServiceNullable> {
        self.requested.as_ref().or(self.original.as_ref())
    }

    /// Copy the XML id out of the delivery service the request is about
    pub fn set_xml_id(&mut self) {
        if let Some(xml_id) = self.delivery_service().and_then(|ds| ds.xml_id.clone()) {
            self.xml_id = xml_id;
        }
    }
}

impl fmt::Display for DeliveryServiceRequestV40 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "<nil>".to_string(), |v| v.to_string())
        }
        fn opt_quoted<T: fmt::Display>(v: &Option<T>) -> String {
            v.as_ref().map_or_else(|| "<nil>".to_string(), |v| format!("{:?}", v.to_string()))
        }
        let stamp = |t: &DateTime<Utc>| t.to_rfc3339_opts(SecondsFormat::Secs, true);

        write!(
            f,
            "DeliveryServiceRequestV40(Assignee={}, AssigneeID={}, Author={:?}, AuthorID={}, ChangeType={:?}, CreatedAt={}, ID={}, LastEditedBy={:?}, LastEditedByID={}, LastUpdated={}, Status={:?})",
            opt_quoted(&self.assignee),
            opt(&self.assignee_id),
            self.author,
            opt(&self.author_id),
            self.change_type.map(|c| c.as_str()).unwrap_or(""),
            stamp(&self.created_at),
            opt(&self.id),
            self.last_edited_by,
            opt(&self.last_edited_by_id),
            stamp(&self.last_updated),
            self.status.map(|s| s.as_str()).unwrap_or(""),
        )
    }
}

impl Downgrade for DeliveryServiceRequestV40 {
    type Legacy = DeliveryServiceRequestNullable;

    /// Legacy requests carry a single delivery service: the original for deletes,
    /// the requested state otherwise
    fn downgrade(&self) -> Result<DeliveryServiceRequestNullable, ConversionError> {
        let delivery_service = match self.change_type {
            Some(DsrChangeType::Delete) => self.original.as_ref().or(self.requested.as_ref()),
            _ => self.delivery_service(),
        }
        .cloned();

        let xml_id = if self.xml_id.is_empty() {
            delivery_service.as_ref().and_then(|ds| ds.xml_id.clone())
        } else {
            Some(self.xml_id.clone())
        };

        Ok(DeliveryServiceRequestNullable {
            assignee: self.assignee.clone(),
            assignee_id: self.assignee_id,
            author: Some(self.author.clone()),
            author_id: self.author_id,
            change_type: self.change_type.map(|c| c.to_string()),
            created_at: Some(self.created_at),
            delivery_service,
            id: self.id,
            last_edited_by: Some(self.last_edited_by.clone()),
            last_edited_by_id: self.last_edited_by_id,
            last_updated: Some(self.last_updated),
            status: self.status,
            xml_id,
        })
    }
}

impl Upgrade for DeliveryServiceRequestNullable {
    type Current = DeliveryServiceRequestV40;

    fn upgrade(&self) -> Result<DeliveryServiceRequestV40, ConversionError> {
        let change_type = self
            .change_type
            .as_deref()
            .filter(|raw| !raw.is_empty())
            .map(|raw| {
                raw.parse::<DsrChangeType>()
                    .map_err(|_| ConversionError::invalid_field("changeType", raw))
            })
            .transpose()?;

        let (original, requested) = match change_type {
            Some(DsrChangeType::Delete) => (self.delivery_service.clone(), None),
            _ => (None, self.delivery_service.clone()),
        };

        let mut upgraded = DeliveryServiceRequestV40 {
            assignee: self.assignee.clone(),
            assignee_id: self.assignee_id,
            author: self.author.clone().unwrap_or_default(),
            author_id: self.author_id,
            change_type,
            created_at: self.created_at.unwrap_or_default(),
            id: self.id,
            last_edited_by: self.last_edited_by.clone().unwrap_or_default(),
            last_edited_by_id: self.last_edited_by_id,
            last_updated: self.last_updated.unwrap_or_default(),
            original,
            requested,
            status: self.status,
            xml_id: self.xml_id.clone().unwrap_or_default(),
        };
        if upgraded.xml_id.is_empty() {
            upgraded.set_xml_id();
        }
        Ok(upgraded)
    }
}
