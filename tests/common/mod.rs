#![allow(dead_code)]

use serde_json::{json, Value};
use tokio::runtime::Runtime;

use traffic_ops_rust::tenancy::InMemoryTenantStore;
use traffic_ops_rust::types::{ApiVersion, TenantId};
use traffic_ops_rust::TenantAuthorizer;

pub const ROOT: TenantId = 1;
pub const A: TenantId = 2;
pub const B: TenantId = 3;
pub const C: TenantId = 4;
pub const S: TenantId = 5;

/// `root(active) -> A(active) -> B(inactive) -> C(active)`, with `root -> S(active)`
pub fn scenario_tree() -> InMemoryTenantStore {
    InMemoryTenantStore::new()
        .with_tenant(ROOT, "root", true, None)
        .with_tenant(A, "A", true, Some(ROOT))
        .with_tenant(B, "B", false, Some(A))
        .with_tenant(C, "C", true, Some(B))
        .with_tenant(S, "S", true, Some(ROOT))
}

pub fn scenario_authorizer() -> TenantAuthorizer<InMemoryTenantStore> {
    TenantAuthorizer::new(scenario_tree())
}

/// Build a store from a parent array: tenant `i` has parent `parents[i]`, with
/// tenant 0 as the root. Parents always point at a lower index so the result is a
/// tree.
pub fn tree_from_parents(parents: &[Option<usize>], active: &[bool]) -> InMemoryTenantStore {
    parents
        .iter()
        .zip(active)
        .enumerate()
        .fold(InMemoryTenantStore::new(), |store, (id, (parent, active))| {
            store.with_tenant(
                id as TenantId,
                &format!("tenant-{}", id),
                *active,
                parent.map(|p| p as TenantId),
            )
        })
}

/// Authorization computed directly from the parent array: every tenant from the
/// user up to the root is active, and walking up from the resource reaches the user.
pub fn oracle_authorized(parents: &[Option<usize>], active: &[bool], user: usize, resource: usize) -> bool {
    let mut node = Some(user);
    while let Some(id) = node {
        if !active[id] {
            return false;
        }
        node = parents[id];
    }

    let mut node = Some(resource);
    while let Some(id) = node {
        if id == user {
            return true;
        }
        node = parents[id];
    }
    false
}

/// Runtime for driving async stores from synchronous proptest bodies
pub fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("failed to build test runtime")
}

pub fn v(major: u32, minor: u32) -> ApiVersion {
    ApiVersion::new(major, minor)
}

/// A pre-3.0 server body with every flat interface field set
pub fn legacy_server() -> Value {
    json!({
        "id": 42,
        "hostName": "edge-01",
        "domainName": "cdn.example.net",
        "cdnId": 1,
        "cdnName": "cdn1",
        "cachegroup": "edge-east",
        "profile": "EDGE_PROFILE",
        "status": "REPORTED",
        "type": "EDGE",
        "ipAddress": "10.0.0.1",
        "ipGateway": "10.0.0.2",
        "ipNetmask": "255.255.255.0",
        "ip6Address": "::1/64",
        "ip6Gateway": "::2",
        "interfaceName": "eth0",
        "interfaceMtu": 1500,
        "ipIsService": true,
        "ip6IsService": true
    })
}
