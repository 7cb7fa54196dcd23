use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};

use crate::models::tenant::Tenant;
use crate::tenancy::error::StoreError;
use crate::types::TenantId;

/// Read-only access to the tenant tree.
///
/// Implementors must provide `fetch_tenant` and `fetch_children`; the tree walks
/// have default implementations built on those two and may be overridden with a
/// single query (see [`crate::tenancy::postgres::PgTenantStore`]).
#[async_trait]
pub trait TenantStore: Send + Sync {
    async fn fetch_tenant(&self, id: TenantId) -> Result<Option<Tenant>, StoreError>;

    /// Direct children of `id`, sorted by id
    async fn fetch_children(&self, id: TenantId) -> Result<Vec<TenantId>, StoreError>;

    /// Longest walk allowed before the tree is considered corrupt
    fn max_depth(&self) -> u32;

    /// `id` followed by each ancestor up to the root. Empty if `id` does not exist.
    async fn fetch_ancestors(&self, id: TenantId) -> Result<Vec<Tenant>, StoreError> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut next = Some(id);

        while let Some(current) = next {
            if !seen.insert(current) {
                return Err(StoreError::Corrupt(format!(
                    "cycle through tenant {} while walking ancestors of {}",
                    current, id
                )));
            }
            if chain.len() > self.max_depth() as usize {
                return Err(StoreError::Corrupt(format!(
                    "ancestors of tenant {} exceed depth {}",
                    id,
                    self.max_depth()
                )));
            }
            let Some(tenant) = self.fetch_tenant(current).await? else {
                if current != id {
                    return Err(StoreError::Corrupt(format!(
                        "tenant {} references missing parent {}",
                        chain.last().map(|t: &Tenant| t.id).unwrap_or(id),
                        current
                    )));
                }
                break;
            };
            next = tenant.parent_id;
            chain.push(tenant);
        }

        Ok(chain)
    }

    /// `id` followed by all of its descendants, breadth-first. Empty if `id` does not exist.
    async fn fetch_subtree(&self, id: TenantId) -> Result<Vec<Tenant>, StoreError> {
        let Some(root) = self.fetch_tenant(id).await? else {
            return Ok(Vec::new());
        };

        let mut subtree = vec![root];
        let mut seen = HashSet::from([id]);
        let mut queue = VecDeque::from([(id, 0u32)]);

        while let Some((parent, depth)) = queue.pop_front() {
            for child in self.fetch_children(parent).await? {
                if !seen.insert(child) {
                    return Err(StoreError::Corrupt(format!(
                        "tenant {} reached twice while walking descendants of {}",
                        child, id
                    )));
                }
                if depth + 1 > self.max_depth() {
                    return Err(StoreError::Corrupt(format!(
                        "descendants of tenant {} exceed depth {}",
                        id,
                        self.max_depth()
                    )));
                }
                let tenant = self.fetch_tenant(child).await?.ok_or_else(|| {
                    StoreError::Corrupt(format!("child tenant {} of {} vanished", child, parent))
                })?;
                subtree.push(tenant);
                queue.push_back((child, depth + 1));
            }
        }

        Ok(subtree)
    }

    /// True when `candidate` is `ancestor` itself or lies somewhere below it
    async fn is_descendant_or_self(
        &self,
        ancestor: TenantId,
        candidate: TenantId,
    ) -> Result<bool, StoreError> {
        Ok(self
            .fetch_ancestors(candidate)
            .await?
            .iter()
            .any(|t| t.id == ancestor))
    }
}

/// Lookups that map a resource to the tenant that owns it
#[async_trait]
pub trait ResourceTenants: Send + Sync {
    /// `None` when the delivery service does not exist, `Some(None)` when it has no tenant
    async fn delivery_service_tenant_by_xml_id(
        &self,
        xml_id: &str,
    ) -> Result<Option<Option<TenantId>>, StoreError>;

    async fn delivery_service_tenant_by_id(
        &self,
        id: i64,
    ) -> Result<Option<Option<TenantId>>, StoreError>;

    /// `None` when the user does not exist, `Some(None)` when it has no tenant
    async fn user_tenant(&self, user_id: i64) -> Result<Option<Option<TenantId>>, StoreError>;
}
