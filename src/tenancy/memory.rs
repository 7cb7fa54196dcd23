use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;

use crate::models::tenant::Tenant;
use crate::tenancy::error::StoreError;
use crate::tenancy::store::{ResourceTenants, TenantStore};
use crate::types::TenantId;

/// Tenant tree held in memory. Built once, then read-only.
#[derive(Debug, Clone)]
pub struct InMemoryTenantStore {
    tenants: BTreeMap<TenantId, Tenant>,
    max_depth: u32,
}

impl Default for InMemoryTenantStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryTenantStore {
    pub fn new() -> Self {
        Self {
            tenants: BTreeMap::new(),
            max_depth: crate::config::config().tenancy.max_tree_depth,
        }
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Add (or replace) a tenant
    pub fn with_tenant(
        mut self,
        id: TenantId,
        name: &str,
        active: bool,
        parent_id: Option<TenantId>,
    ) -> Self {
        self.tenants.insert(
            id,
            Tenant {
                id,
                name: name.to_string(),
                active,
                parent_id,
                last_updated: Utc::now(),
            },
        );
        self
    }

    pub fn from_tenants(tenants: impl IntoIterator<Item = Tenant>) -> Self {
        let mut store = Self::new();
        store.tenants.extend(tenants.into_iter().map(|t| (t.id, t)));
        store
    }

    pub fn len(&self) -> usize {
        self.tenants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }
}

#[async_trait]
impl TenantStore for InMemoryTenantStore {
    async fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError> {
        Ok(self.tenants.get(&id).cloned())
    }

    async fn fetch_children(&self, id: TenantId) -> Result<Vec<TenantId>, StoreError> {
        // BTreeMap iteration keeps the ids sorted
        Ok(self
            .tenants
            .values()
            .filter(|t| t.parent_id == Some(id))
            .map(|t| t.id)
            .collect())
    }

    fn max_depth(&self) -> u32 {
        self.max_depth
    }
}

/// Delivery service and user ownership held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryResources {
    delivery_services: Vec<(i64, String, Option<TenantId>)>,
    users: BTreeMap<i64, Option<TenantId>>,
}

impl InMemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delivery_service(mut self, id: i64, xml_id: &str, tenant_id: Option<TenantId>) -> Self {
        self.delivery_services.push((id, xml_id.to_string(), tenant_id));
        self
    }

    pub fn with_user(mut self, user_id: i64, tenant_id: Option<TenantId>) -> Self {
        self.users.insert(user_id, tenant_id);
        self
    }
}

#[async_trait]
impl ResourceTenants for InMemoryResources {
    async fn delivery_service_tenant_by_xml_id(
        &self,
        xml_id: &str,
    ) -> Result<Option<Option<TenantId>>, StoreError> {
        Ok(self
            .delivery_services
            .iter()
            .find(|(_, xml, _)| xml == xml_id)
            .map(|(_, _, tenant_id)| *tenant_id))
    }

    async fn delivery_service_tenant_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Option<TenantId>>, StoreError> {
        Ok(self
            .delivery_services
            .iter()
            .find(|(ds_id, _, _)| *ds_id == id)
            .map(|(_, _, tenant_id)| *tenant_id))
    }

    async fn user_tenant(&self, user_id: i64) -> Result<Option<Option<TenantId>>, StoreError> {
        Ok(self.users.get(&user_id).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{linear_chain, scenario_tree as tree};

    #[tokio::test]
    async fn walks_ancestors_leaf_first() {
        let ids: Vec<_> = tree().fetch_ancestors(4).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![4, 3, 2, 1]);
    }

    #[tokio::test]
    async fn walks_subtree_breadth_first() {
        let ids: Vec<_> = tree().fetch_subtree(1).await.unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 2, 5, 3, 4]);
    }

    #[tokio::test]
    async fn unknown_tenant_has_no_chain() {
        let store = tree();
        assert!(store.fetch_ancestors(99).await.unwrap().is_empty());
        assert!(store.fetch_subtree(99).await.unwrap().is_empty());
        assert!(!store.is_descendant_or_self(1, 99).await.unwrap());
    }

    #[tokio::test]
    async fn detects_cycles() {
        let store = InMemoryTenantStore::new()
            .with_tenant(1, "x", true, Some(2))
            .with_tenant(2, "y", true, Some(1));
        let err = store.fetch_ancestors(1).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[tokio::test]
    async fn detects_dangling_parent() {
        let store = InMemoryTenantStore::new().with_tenant(1, "orphan", true, Some(42));
        assert!(matches!(store.fetch_ancestors(1).await, Err(StoreError::Corrupt(_))));
    }

    #[tokio::test]
    async fn enforces_depth_limit() {
        let store = linear_chain(5).with_max_depth(2);
        assert!(matches!(store.fetch_ancestors(4).await, Err(StoreError::Corrupt(_))));
        assert!(matches!(store.fetch_subtree(0).await, Err(StoreError::Corrupt(_))));
    }
}
