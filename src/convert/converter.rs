use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::convert::registry::{shape_for, EntityKind, Shape};
use crate::convert::{ConversionError, Downgrade, Upgrade};
use crate::models::{
    DeliveryServiceRequestNullable, DeliveryServiceRequestV40, Parameter, ParameterNullable, Role,
    RoleV11, RoleV4, ServerNullableV2, ServerV40, Tenant, TenantNullable,
};
use crate::types::ApiVersion;

/// Translates request and response bodies between API versions.
///
/// Stateless: each call resolves the source and target shapes from the registry,
/// walks the upgrade or downgrade chain between them and re-encodes the result.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionedEntityConverter;

impl VersionedEntityConverter {
    pub fn new() -> Self {
        Self
    }

    pub fn convert(
        &self,
        kind: EntityKind,
        from: ApiVersion,
        to: ApiVersion,
        body: Value,
    ) -> Result<Value, ConversionError> {
        let source = shape_for(kind, from)?;
        let target = shape_for(kind, to)?;
        debug!("Converting {} from {} ({:?}) to {} ({:?})", kind, from, source, to, target);

        match kind {
            EntityKind::Role => convert_role(source, target, body),
            EntityKind::Server => convert_pair::<ServerNullableV2, ServerV40>(
                kind,
                source == Shape::ServerNullableV2,
                target == Shape::ServerNullableV2,
                body,
            ),
            EntityKind::DeliveryServiceRequest => {
                convert_pair::<DeliveryServiceRequestNullable, DeliveryServiceRequestV40>(
                    kind,
                    source == Shape::DeliveryServiceRequestNullable,
                    target == Shape::DeliveryServiceRequestNullable,
                    body,
                )
            }
            EntityKind::Parameter => convert_pair::<ParameterNullable, Parameter>(
                kind,
                source == Shape::ParameterNullable,
                target == Shape::ParameterNullable,
                body,
            ),
            EntityKind::Tenant => convert_pair::<TenantNullable, Tenant>(
                kind,
                source == Shape::TenantNullable,
                target == Shape::TenantNullable,
                body,
            ),
        }
    }

    /// Convert each element of a JSON array, failing on the first bad element
    pub fn convert_many(
        &self,
        kind: EntityKind,
        from: ApiVersion,
        to: ApiVersion,
        bodies: Vec<Value>,
    ) -> Result<Vec<Value>, ConversionError> {
        bodies
            .into_iter()
            .map(|body| self.convert(kind, from, to, body))
            .collect()
    }
}

fn decode<T: DeserializeOwned>(kind: EntityKind, body: Value) -> Result<T, ConversionError> {
    serde_json::from_value(body).map_err(|e| ConversionError::InvalidBody {
        kind,
        reason: e.to_string(),
    })
}

fn encode<T: Serialize>(kind: EntityKind, value: &T) -> Result<Value, ConversionError> {
    serde_json::to_value(value).map_err(|e| ConversionError::Encode {
        kind,
        reason: e.to_string(),
    })
}

/// Kinds with exactly one legacy and one current shape
fn convert_pair<L, C>(
    kind: EntityKind,
    source_legacy: bool,
    target_legacy: bool,
    body: Value,
) -> Result<Value, ConversionError>
where
    L: Upgrade<Current = C> + DeserializeOwned + Serialize,
    C: Downgrade<Legacy = L> + DeserializeOwned + Serialize,
{
    match (source_legacy, target_legacy) {
        (true, true) => encode(kind, &decode::<L>(kind, body)?),
        (true, false) => encode(kind, &decode::<L>(kind, body)?.upgrade()?),
        (false, true) => encode(kind, &decode::<C>(kind, body)?.downgrade()?),
        (false, false) => encode(kind, &decode::<C>(kind, body)?),
    }
}

/// Roles have three shapes; walk only the steps between source and target
fn convert_role(source: Shape, target: Shape, body: Value) -> Result<Value, ConversionError> {
    let kind = EntityKind::Role;
    match (source, target) {
        (Shape::RoleV11, Shape::RoleV11) => encode(kind, &decode::<RoleV11>(kind, body)?),
        (Shape::RoleV11, Shape::Role) => encode(kind, &decode::<RoleV11>(kind, body)?.upgrade()?),
        (Shape::RoleV11, _) => encode(kind, &decode::<RoleV11>(kind, body)?.upgrade()?.upgrade()?),
        (Shape::Role, Shape::RoleV11) => encode(kind, &decode::<Role>(kind, body)?.downgrade()?),
        (Shape::Role, Shape::Role) => encode(kind, &decode::<Role>(kind, body)?),
        (Shape::Role, _) => encode(kind, &decode::<Role>(kind, body)?.upgrade()?),
        (_, Shape::RoleV11) => encode(kind, &decode::<RoleV4>(kind, body)?.downgrade()?.downgrade()?),
        (_, Shape::Role) => encode(kind, &decode::<RoleV4>(kind, body)?.downgrade()?),
        (_, _) => encode(kind, &decode::<RoleV4>(kind, body)?),
    }
}
