use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::TenantId;

/// A delivery service as embedded in delivery service requests.
///
/// Only the fields the core inspects are typed. Everything else the client sent
/// is carried through untouched in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryServiceNullable {
    pub id: Option<i64>,
    #[serde(rename = "xmlId")]
    pub xml_id: Option<String>,
    pub tenant_id: Option<TenantId>,
    pub display_name: Option<String>,
    pub active: Option<bool>,
    #[serde(rename = "cdnId")]
    pub cdn_id: Option<i64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields() {
        let body = json!({"xmlId": "demo", "tenantId": 3, "routingName": "cdn", "geoLimit": 0});
        let ds: DeliveryServiceNullable = serde_json::from_value(body.clone()).unwrap();
        assert_eq!(ds.xml_id.as_deref(), Some("demo"));
        assert_eq!(ds.tenant_id, Some(3));
        assert_eq!(ds.extra.len(), 2);

        let back = serde_json::to_value(&ds).unwrap();
        assert_eq!(back["routingName"], "cdn");
        assert_eq!(back["xmlId"], "demo");
    }
}
