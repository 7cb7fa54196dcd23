//! Fixtures shared by unit tests

use crate::tenancy::InMemoryTenantStore;

/// `root(1, active) -> A(2, active) -> B(3, inactive) -> C(4, active)`, plus
/// `root -> S(5, active)` as a sibling branch of A
pub fn scenario_tree() -> InMemoryTenantStore {
    InMemoryTenantStore::new()
        .with_tenant(1, "root", true, None)
        .with_tenant(2, "A", true, Some(1))
        .with_tenant(3, "B", false, Some(2))
        .with_tenant(4, "C", true, Some(3))
        .with_tenant(5, "S", true, Some(1))
}

/// Straight chain `0 -> 1 -> ... -> len-1`, all active
pub fn linear_chain(len: i64) -> InMemoryTenantStore {
    (1..len).fold(
        InMemoryTenantStore::new().with_tenant(0, "t0", true, None),
        |store, id| store.with_tenant(id, &format!("t{}", id), true, Some(id - 1)),
    )
}
