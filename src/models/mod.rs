pub mod delivery_service;
pub mod dsr;
pub mod parameter;
pub mod role;
pub mod server;
pub mod tenant;

pub use delivery_service::DeliveryServiceNullable;
pub use dsr::{
    ChangeTypeError, DeliveryServiceRequestNullable, DeliveryServiceRequestV40, DsrChangeType,
    RequestStatus, RequestStatusError,
};
pub use parameter::{Parameter, ParameterNullable};
pub use role::{PrivLevelError, Role, RoleV11, RoleV4};
pub use server::{
    interfaces_to_legacy, CommonServerProperties, LegacyInterfaceDetails, Server, ServerInterfaceInfo,
    ServerIpAddress, ServerNullableV2, ServerV40,
};
pub use tenant::{Tenant, TenantAncestor, TenantNullable};
