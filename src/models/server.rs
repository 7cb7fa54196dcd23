use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, warn};

use crate::convert::{ConversionError, Downgrade, Upgrade};

/// Server record from API 1.x, every field required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub cachegroup: String,
    pub cachegroup_id: i64,
    pub cdn_id: i64,
    pub cdn_name: String,
    pub delivery_services: BTreeMap<String, Vec<String>>,
    pub domain_name: String,
    pub fqdn: Option<String>,
    #[serde(skip)]
    pub fqdn_time: DateTime<Utc>,
    pub guid: String,
    pub host_name: String,
    pub https_port: i64,
    pub id: i64,
    pub ilo_ip_address: String,
    pub ilo_ip_gateway: String,
    pub ilo_ip_netmask: String,
    pub ilo_password: String,
    pub ilo_username: String,
    pub interface_mtu: i64,
    pub interface_name: String,
    pub ip6_address: String,
    pub ip6_is_service: bool,
    pub ip6_gateway: String,
    pub ip_address: String,
    pub ip_is_service: bool,
    pub ip_gateway: String,
    pub ip_netmask: String,
    pub last_updated: DateTime<Utc>,
    pub mgmt_ip_address: String,
    pub mgmt_ip_gateway: String,
    pub mgmt_ip_netmask: String,
    pub offline_reason: String,
    pub phys_location: String,
    pub phys_location_id: i64,
    pub profile: String,
    pub profile_desc: String,
    pub profile_id: i64,
    pub rack: String,
    pub reval_pending: bool,
    pub router_host_name: String,
    pub router_port_name: String,
    pub status: String,
    pub status_id: i64,
    pub tcp_port: i64,
    #[serde(rename = "type")]
    pub server_type: String,
    pub type_id: i64,
    pub upd_pending: bool,
    pub xmpp_id: String,
    pub xmpp_passwd: String,
}

/// Fields every server shape shares, all optional
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonServerProperties {
    pub cachegroup: Option<String>,
    pub cachegroup_id: Option<i64>,
    pub cdn_id: Option<i64>,
    pub cdn_name: Option<String>,
    pub delivery_services: Option<BTreeMap<String, Vec<String>>>,
    pub domain_name: Option<String>,
    pub fqdn: Option<String>,
    #[serde(skip)]
    pub fqdn_time: Option<DateTime<Utc>>,
    pub guid: Option<String>,
    pub host_name: Option<String>,
    pub https_port: Option<i64>,
    pub id: Option<i64>,
    pub ilo_ip_address: Option<String>,
    pub ilo_ip_gateway: Option<String>,
    pub ilo_ip_netmask: Option<String>,
    pub ilo_password: Option<String>,
    pub ilo_username: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub mgmt_ip_address: Option<String>,
    pub mgmt_ip_gateway: Option<String>,
    pub mgmt_ip_netmask: Option<String>,
    pub offline_reason: Option<String>,
    pub phys_location: Option<String>,
    pub phys_location_id: Option<i64>,
    pub profile: Option<String>,
    pub profile_desc: Option<String>,
    pub profile_id: Option<i64>,
    pub rack: Option<String>,
    pub reval_pending: Option<bool>,
    pub router_host_name: Option<String>,
    pub router_port_name: Option<String>,
    pub status: Option<String>,
    pub status_id: Option<i64>,
    pub tcp_port: Option<i64>,
    #[serde(rename = "type")]
    pub server_type: Option<String>,
    pub type_id: Option<i64>,
    pub upd_pending: Option<bool>,
    pub xmpp_id: Option<String>,
    pub xmpp_passwd: Option<String>,
}

/// The single network interface of pre-3.0 servers, spread over flat fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyInterfaceDetails {
    pub interface_mtu: Option<i64>,
    pub interface_name: Option<String>,
    pub ip6_address: Option<String>,
    pub ip6_gateway: Option<String>,
    pub ip_address: Option<String>,
    pub ip_gateway: Option<String>,
    pub ip_netmask: Option<String>,
}

/// Server as served before API 3.0
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerNullableV2 {
    #[serde(flatten)]
    pub common: CommonServerProperties,
    #[serde(flatten)]
    pub interface: LegacyInterfaceDetails,
    pub ip_is_service: Option<bool>,
    pub ip6_is_service: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerIpAddress {
    /// Address with an optional `/prefix`
    pub address: String,
    pub gateway: Option<String>,
    pub service_address: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInterfaceInfo {
    pub ip_addresses: Vec<ServerIpAddress>,
    pub max_bandwidth: Option<u64>,
    pub monitor: bool,
    pub mtu: Option<u64>,
    pub name: String,
}

impl ServerInterfaceInfo {
    pub fn has_service_address(&self) -> bool {
        self.ip_addresses.iter().any(|ip| ip.service_address)
    }
}

/// Server as served by API 3.0 and later
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerV40 {
    #[serde(flatten)]
    pub common: CommonServerProperties,
    #[serde(default)]
    pub interfaces: Vec<ServerInterfaceInfo>,
    pub status_last_updated: Option<DateTime<Utc>>,
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|s| !s.is_empty())
}

/// `255.255.255.0` -> 24. Only contiguous masks are accepted.
fn netmask_to_prefix(mask: &str) -> Result<u32, ConversionError> {
    let bits = mask
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| ConversionError::invalid_field("ipNetmask", mask))?;
    let prefix = bits.leading_ones();
    if bits.checked_shl(prefix).unwrap_or(0) != 0 {
        return Err(ConversionError::invalid_field("ipNetmask", mask));
    }
    Ok(prefix)
}

fn prefix_to_netmask(prefix: u32) -> Ipv4Addr {
    match prefix {
        0 => Ipv4Addr::UNSPECIFIED,
        p => Ipv4Addr::from(u32::MAX << (32 - p.min(32))),
    }
}

/// Split `addr[/prefix]` and check both halves
fn parse_address(raw: &str) -> Result<(IpAddr, Option<u32>), ConversionError> {
    let invalid = || ConversionError::invalid_field("ipAddresses", raw);
    let (host, prefix) = match raw.split_once('/') {
        Some((host, prefix)) => (host, Some(prefix.parse::<u32>().map_err(|_| invalid())?)),
        None => (raw, None),
    };
    let ip: IpAddr = host.parse().map_err(|_| invalid())?;
    let max = if ip.is_ipv4() { 32 } else { 128 };
    if prefix.is_some_and(|p| p > max) {
        return Err(invalid());
    }
    Ok((ip, prefix))
}

impl LegacyInterfaceDetails {
    /// Build the interface list a 3.0+ server would carry.
    ///
    /// Produces exactly one interface holding up to one IPv4 and one IPv6 address.
    /// An IPv4 netmask is folded into the address as a prefix length. Empty strings
    /// count as absent. Fails only when there is neither a name nor an address.
    pub fn to_interfaces(
        &self,
        ipv4_is_service: bool,
        ipv6_is_service: bool,
    ) -> Result<Vec<ServerInterfaceInfo>, ConversionError> {
        let name = non_empty(&self.interface_name);
        let ipv4 = non_empty(&self.ip_address);
        let ipv6 = non_empty(&self.ip6_address);
        if name.is_none() && ipv4.is_none() && ipv6.is_none() {
            return Err(ConversionError::structural("server", "interfaceName"));
        }

        let mut ip_addresses = Vec::with_capacity(2);
        if let Some(ip) = ipv4 {
            let address = match non_empty(&self.ip_netmask) {
                Some(mask) => format!("{}/{}", ip, netmask_to_prefix(mask)?),
                None => ip.to_string(),
            };
            ip_addresses.push(ServerIpAddress {
                address,
                gateway: non_empty(&self.ip_gateway).map(str::to_string),
                service_address: ipv4_is_service,
            });
        }
        if let Some(ip6) = ipv6 {
            ip_addresses.push(ServerIpAddress {
                address: ip6.to_string(),
                gateway: non_empty(&self.ip6_gateway).map(str::to_string),
                service_address: ipv6_is_service,
            });
        }

        Ok(vec![ServerInterfaceInfo {
            ip_addresses,
            max_bandwidth: None,
            monitor: false,
            mtu: self.interface_mtu.and_then(|mtu| u64::try_from(mtu).ok()),
            name: name.unwrap_or_default().to_string(),
        }])
    }
}

/// Interface a legacy client gets to see: the first one carrying a service
/// address, or the first one when none does
fn select_interface(interfaces: &[ServerInterfaceInfo]) -> Option<&ServerInterfaceInfo> {
    interfaces
        .iter()
        .find(|iface| iface.has_service_address())
        .or_else(|| interfaces.first())
}

struct Flattened {
    details: LegacyInterfaceDetails,
    ip_is_service: Option<bool>,
    ip6_is_service: Option<bool>,
}

fn flatten(iface: &ServerInterfaceInfo) -> Result<Flattened, ConversionError> {
    if iface.name.is_empty() && iface.ip_addresses.is_empty() {
        return Err(ConversionError::structural("server", "interfaceName"));
    }

    let mut flat = Flattened {
        details: LegacyInterfaceDetails {
            interface_mtu: iface.mtu.and_then(|mtu| i64::try_from(mtu).ok()),
            interface_name: Some(iface.name.clone()),
            ..Default::default()
        },
        ip_is_service: None,
        ip6_is_service: None,
    };

    for ip in &iface.ip_addresses {
        let (addr, prefix) = parse_address(&ip.address)?;
        match addr {
            IpAddr::V4(v4) if flat.details.ip_address.is_none() => {
                flat.details.ip_address = Some(v4.to_string());
                flat.details.ip_netmask = prefix.map(|p| prefix_to_netmask(p).to_string());
                flat.details.ip_gateway = ip.gateway.clone();
                flat.ip_is_service = Some(ip.service_address);
            }
            IpAddr::V6(_) if flat.details.ip6_address.is_none() => {
                flat.details.ip6_address = Some(ip.address.clone());
                flat.details.ip6_gateway = ip.gateway.clone();
                flat.ip6_is_service = Some(ip.service_address);
            }
            _ => debug!("Interface {} address {} has no legacy field", iface.name, ip.address),
        }
    }
    Ok(flat)
}

/// Flatten a 3.0+ interface list to the legacy fields. Lossy when there is more
/// than one interface, or more than one address per family. Fails on an empty
/// list, or on an interface with neither a name nor an address, since neither
/// could be upgraded again.
pub fn interfaces_to_legacy(
    interfaces: &[ServerInterfaceInfo],
) -> Result<LegacyInterfaceDetails, ConversionError> {
    let iface = select_interface(interfaces)
        .ok_or_else(|| ConversionError::structural("server", "interfaces"))?;
    Ok(flatten(iface)?.details)
}

impl Server {
    pub fn to_nullable(&self) -> ServerNullableV2 {
        ServerNullableV2 {
            common: CommonServerProperties {
                cachegroup: Some(self.cachegroup.clone()),
                cachegroup_id: Some(self.cachegroup_id),
                cdn_id: Some(self.cdn_id),
                cdn_name: Some(self.cdn_name.clone()),
                delivery_services: Some(self.delivery_services.clone()),
                domain_name: Some(self.domain_name.clone()),
                fqdn: self.fqdn.clone(),
                fqdn_time: Some(self.fqdn_time),
                guid: Some(self.guid.clone()),
                host_name: Some(self.host_name.clone()),
                https_port: Some(self.https_port),
                id: Some(self.id),
                ilo_ip_address: Some(self.ilo_ip_address.clone()),
                ilo_ip_gateway: Some(self.ilo_ip_gateway.clone()),
                ilo_ip_netmask: Some(self.ilo_ip_netmask.clone()),
                ilo_password: Some(self.ilo_password.clone()),
                ilo_username: Some(self.ilo_username.clone()),
                last_updated: Some(self.last_updated),
                mgmt_ip_address: Some(self.mgmt_ip_address.clone()),
                mgmt_ip_gateway: Some(self.mgmt_ip_gateway.clone()),
                mgmt_ip_netmask: Some(self.mgmt_ip_netmask.clone()),
                offline_reason: Some(self.offline_reason.clone()),
                phys_location: Some(self.phys_location.clone()),
                phys_location_id: Some(self.phys_location_id),
                profile: Some(self.profile.clone()),
                profile_desc: Some(self.profile_desc.clone()),
                profile_id: Some(self.profile_id),
                rack: Some(self.rack.clone()),
                reval_pending: Some(self.reval_pending),
                router_host_name: Some(self.router_host_name.clone()),
                router_port_name: Some(self.router_port_name.clone()),
                status: Some(self.status.clone()),
                status_id: Some(self.status_id),
                tcp_port: Some(self.tcp_port),
                server_type: Some(self.server_type.clone()),
                type_id: Some(self.type_id),
                upd_pending: Some(self.upd_pending),
                xmpp_id: Some(self.xmpp_id.clone()),
                xmpp_passwd: Some(self.xmpp_passwd.clone()),
            },
            interface: LegacyInterfaceDetails {
                interface_mtu: Some(self.interface_mtu),
                interface_name: Some(self.interface_name.clone()),
                ip6_address: Some(self.ip6_address.clone()),
                ip6_gateway: Some(self.ip6_gateway.clone()),
                ip_address: Some(self.ip_address.clone()),
                ip_gateway: Some(self.ip_gateway.clone()),
                ip_netmask: Some(self.ip_netmask.clone()),
            },
            ip_is_service: Some(self.ip_is_service),
            ip6_is_service: Some(self.ip6_is_service),
        }
    }
}

impl Upgrade for ServerNullableV2 {
    type Current = ServerV40;

    fn upgrade(&self) -> Result<ServerV40, ConversionError> {
        let interfaces = self.interface.to_interfaces(
            self.ip_is_service.unwrap_or(false),
            self.ip6_is_service.unwrap_or(false),
        )?;
        Ok(ServerV40 {
            common: self.common.clone(),
            interfaces,
            status_last_updated: None,
        })
    }
}

impl Downgrade for ServerV40 {
    type Legacy = ServerNullableV2;

    fn downgrade(&self) -> Result<ServerNullableV2, ConversionError> {
        if self.interfaces.len() > 1 {
            warn!(
                "Server {} has {} interfaces, legacy clients see only one",
                self.common.host_name.as_deref().unwrap_or("<unnamed>"),
                self.interfaces.len()
            );
        }

        // Legacy servers always carry an interface, so an empty list has no legacy form
        let iface = select_interface(&self.interfaces)
            .ok_or_else(|| ConversionError::structural("server", "interfaces"))?;
        let flat = flatten(iface)?;

        Ok(ServerNullableV2 {
            common: self.common.clone(),
            interface: flat.details,
            ip_is_service: flat.ip_is_service,
            ip6_is_service: flat.ip6_is_service,
        })
    }
}
