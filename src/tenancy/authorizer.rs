use std::collections::BTreeSet;
use tracing::{debug, error, warn};

use crate::models::tenant::{Tenant, TenantAncestor};
use crate::tenancy::error::{StoreError, TenancyError};
use crate::tenancy::store::{ResourceTenants, TenantStore};
use crate::types::TenantId;

/// Decides whether a user, through their tenant, may act on a tenant-owned resource.
///
/// Authority flows from a tenant down to its descendants. A user is only effective
/// while every tenant on the path from their own tenant up to the root is active;
/// one inactive ancestor revokes access for its entire subtree.
///
/// Every call re-reads the tree, so the authorizer itself holds no state beyond the
/// store handle and is safe to share across tasks.
pub struct TenantAuthorizer<S> {
    store: S,
}

impl<S: TenantStore> TenantAuthorizer<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Is `resource_tenant_id` the user's tenant or one of its descendants, with the
    /// user's whole ancestor chain active?
    ///
    /// An unknown resource tenant is simply not authorized. An unknown user tenant
    /// means the caller's session is inconsistent and is reported as a system error.
    pub async fn is_authorized(
        &self,
        user_tenant_id: TenantId,
        resource_tenant_id: TenantId,
    ) -> Result<bool, TenancyError> {
        debug!(
            "Checking user tenant {} access on resource tenant {}",
            user_tenant_id, resource_tenant_id
        );

        if !self.user_chain_active(user_tenant_id).await? {
            debug!("User tenant {} has an inactive ancestor chain", user_tenant_id);
            return Ok(false);
        }

        let in_subtree = self
            .store
            .is_descendant_or_self(user_tenant_id, resource_tenant_id)
            .await
            .map_err(|e| store_failure(user_tenant_id, e))?;

        debug!(
            "Resource tenant {} within subtree of {}: {}",
            resource_tenant_id, user_tenant_id, in_subtree
        );
        Ok(in_subtree)
    }

    /// Same decision as [`Self::is_authorized`], with a denial reported as
    /// [`TenancyError::Forbidden`]
    pub async fn authorize(
        &self,
        user_tenant_id: TenantId,
        resource_tenant_id: TenantId,
    ) -> Result<(), TenancyError> {
        if self.is_authorized(user_tenant_id, resource_tenant_id).await? {
            Ok(())
        } else {
            warn!(
                "Denied user tenant {} access on resource tenant {}",
                user_tenant_id, resource_tenant_id
            );
            Err(TenancyError::Forbidden {
                user_tenant_id,
                resource_tenant_id,
            })
        }
    }

    /// Every tenant id in the user's subtree, or nothing at all when any tenant on
    /// the user's ancestor chain is inactive
    pub async fn resolve_accessible_tenant_ids(
        &self,
        user_tenant_id: TenantId,
    ) -> Result<BTreeSet<TenantId>, TenancyError> {
        if !self.user_chain_active(user_tenant_id).await? {
            return Ok(BTreeSet::new());
        }

        let subtree = self
            .store
            .fetch_subtree(user_tenant_id)
            .await
            .map_err(|e| store_failure(user_tenant_id, e))?;
        Ok(subtree.into_iter().map(|t| t.id).collect())
    }

    /// The raw ancestor chain, user's tenant first and root last. Activation is
    /// reported per tenant, not combined.
    pub async fn resolve_all_ancestors(
        &self,
        user_tenant_id: TenantId,
    ) -> Result<Vec<TenantAncestor>, TenancyError> {
        let chain = self.ancestors(user_tenant_id).await?;
        Ok(chain.iter().map(TenantAncestor::from).collect())
    }

    /// The user's tenant and all descendants, whatever their activation. Used for
    /// administrative tenant listings.
    pub async fn resolve_subtree(&self, user_tenant_id: TenantId) -> Result<Vec<Tenant>, TenancyError> {
        let subtree = self
            .store
            .fetch_subtree(user_tenant_id)
            .await
            .map_err(|e| store_failure(user_tenant_id, e))?;
        if subtree.is_empty() {
            return Err(TenancyError::UserTenantMissing(user_tenant_id));
        }
        Ok(subtree)
    }

    /// Gate access to a delivery service identified by its xml id. A delivery
    /// service without a tenant cannot be checked and is a system error.
    pub async fn check_delivery_service<R: ResourceTenants>(
        &self,
        resources: &R,
        user_tenant_id: TenantId,
        xml_id: &str,
    ) -> Result<(), TenancyError> {
        let tenant = resources
            .delivery_service_tenant_by_xml_id(xml_id)
            .await
            .map_err(|e| store_failure(user_tenant_id, e))?
            .ok_or_else(|| TenancyError::NoSuchDeliveryService(xml_id.to_string()))?;
        match tenant {
            Some(tenant) => self.authorize(user_tenant_id, tenant).await,
            None => {
                error!("Delivery service '{}' has no tenant", xml_id);
                Err(TenancyError::TenantUnassigned {
                    resource: "deliveryservice",
                    key: xml_id.to_string(),
                })
            }
        }
    }

    /// Gate access to a delivery service identified by its numeric id. A delivery
    /// service without a tenant is visible to everyone.
    pub async fn check_delivery_service_id<R: ResourceTenants>(
        &self,
        resources: &R,
        user_tenant_id: TenantId,
        ds_id: i64,
    ) -> Result<(), TenancyError> {
        let tenant = resources
            .delivery_service_tenant_by_id(ds_id)
            .await
            .map_err(|e| store_failure(user_tenant_id, e))?
            .ok_or_else(|| TenancyError::ResourceNotFound {
                resource: "deliveryservice",
                key: ds_id.to_string(),
            })?;
        self.authorize_owned(user_tenant_id, tenant).await
    }

    /// Gate a change to a user account. Updates and deletes must be authorized on
    /// the target's current tenant; creates and updates on the requested tenant.
    pub async fn check_user_change<R: ResourceTenants>(
        &self,
        resources: &R,
        user_tenant_id: TenantId,
        target_user_id: Option<i64>,
        new_tenant_id: Option<TenantId>,
    ) -> Result<(), TenancyError> {
        if let Some(target) = target_user_id {
            let current = resources
                .user_tenant(target)
                .await
                .map_err(|e| store_failure(user_tenant_id, e))?;
            match current {
                Some(Some(current)) => self.authorize(user_tenant_id, current).await?,
                Some(None) => {
                    error!("User {} has no tenant", target);
                    return Err(TenancyError::TenantUnassigned {
                        resource: "user",
                        key: target.to_string(),
                    });
                }
                None => {
                    return Err(TenancyError::ResourceNotFound {
                        resource: "user",
                        key: target.to_string(),
                    })
                }
            }
        }
        if let Some(new_tenant) = new_tenant_id {
            self.authorize(user_tenant_id, new_tenant).await?;
        }
        Ok(())
    }

    /// Resources without an owning tenant are visible to everyone
    async fn authorize_owned(
        &self,
        user_tenant_id: TenantId,
        owner: Option<TenantId>,
    ) -> Result<(), TenancyError> {
        match owner {
            Some(owner) => self.authorize(user_tenant_id, owner).await,
            None => Ok(()),
        }
    }

    async fn ancestors(&self, user_tenant_id: TenantId) -> Result<Vec<Tenant>, TenancyError> {
        let chain = self
            .store
            .fetch_ancestors(user_tenant_id)
            .await
            .map_err(|e| store_failure(user_tenant_id, e))?;
        if chain.is_empty() {
            error!("User tenant {} does not exist", user_tenant_id);
            return Err(TenancyError::UserTenantMissing(user_tenant_id));
        }
        Ok(chain)
    }

    /// Logical AND of `active` from the user's tenant up to the root
    async fn user_chain_active(&self, user_tenant_id: TenantId) -> Result<bool, TenancyError> {
        let chain = self.ancestors(user_tenant_id).await?;
        Ok(chain.iter().all(|t| t.active))
    }
}

fn store_failure(user_tenant_id: TenantId, err: StoreError) -> TenancyError {
    error!("Error checking tenancy for user tenant {}: {}", user_tenant_id, err);
    TenancyError::Store(err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::tenancy::memory::{InMemoryResources, InMemoryTenantStore};
    use crate::testing::scenario_tree;

    fn authorizer() -> TenantAuthorizer<InMemoryTenantStore> {
        TenantAuthorizer::new(scenario_tree())
    }

    #[tokio::test]
    async fn active_user_reaches_descendants_through_inactive_nodes() {
        let auth = authorizer();
        assert!(auth.is_authorized(2, 4).await.unwrap());
        assert!(auth.is_authorized(2, 3).await.unwrap());
        assert!(auth.is_authorized(2, 2).await.unwrap());
    }

    #[tokio::test]
    async fn user_below_inactive_tenant_is_denied_everywhere() {
        let auth = authorizer();
        assert!(!auth.is_authorized(4, 4).await.unwrap());
        assert!(!auth.is_authorized(3, 4).await.unwrap());
    }

    #[tokio::test]
    async fn ancestors_and_siblings_are_outside_the_subtree() {
        let auth = authorizer();
        assert!(!auth.is_authorized(2, 1).await.unwrap());
        assert!(!auth.is_authorized(2, 5).await.unwrap());
        assert!(auth.is_authorized(1, 5).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_resource_tenant_is_denied_without_error() {
        assert!(!authorizer().is_authorized(1, 404).await.unwrap());
    }

    #[tokio::test]
    async fn unknown_user_tenant_is_a_system_error() {
        let err = authorizer().is_authorized(404, 1).await.unwrap_err();
        assert!(matches!(err, TenancyError::UserTenantMissing(404)));
        assert_eq!(err.kind(), ErrorKind::System);
    }

    #[tokio::test]
    async fn authorize_reports_denial_as_user_error() {
        let err = authorizer().authorize(2, 5).await.unwrap_err();
        assert!(matches!(err, TenancyError::Forbidden { user_tenant_id: 2, resource_tenant_id: 5 }));
        assert_eq!(err.kind(), ErrorKind::User);
        assert!(authorizer().authorize(2, 4).await.is_ok());
    }

    #[tokio::test]
    async fn accessible_ids_fail_closed_on_inactive_chain() {
        let auth = authorizer();
        assert_eq!(
            auth.resolve_accessible_tenant_ids(2).await.unwrap(),
            BTreeSet::from([2, 3, 4])
        );
        assert!(auth.resolve_accessible_tenant_ids(3).await.unwrap().is_empty());
        assert!(auth.resolve_accessible_tenant_ids(4).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ancestors_are_raw_and_ordered() {
        let chain = authorizer().resolve_all_ancestors(4).await.unwrap();
        let summary: Vec<_> = chain.iter().map(|a| (a.id, a.active, a.name.as_str())).collect();
        assert_eq!(
            summary,
            vec![(4, true, "C"), (3, false, "B"), (2, true, "A"), (1, true, "root")]
        );
    }

    #[tokio::test]
    async fn subtree_ignores_activation() {
        let ids: Vec<_> = authorizer()
            .resolve_subtree(3)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[tokio::test]
    async fn delivery_service_checks() {
        let auth = authorizer();
        let resources = InMemoryResources::new()
            .with_delivery_service(10, "east-video", Some(4))
            .with_delivery_service(11, "shared", None)
            .with_delivery_service(12, "other", Some(5));

        assert!(auth.check_delivery_service(&resources, 2, "east-video").await.is_ok());
        assert!(auth.check_delivery_service_id(&resources, 2, 11).await.is_ok());
        assert!(matches!(
            auth.check_delivery_service_id(&resources, 2, 12).await,
            Err(TenancyError::Forbidden { .. })
        ));
        assert!(matches!(
            auth.check_delivery_service(&resources, 2, "missing").await,
            Err(TenancyError::NoSuchDeliveryService(ref xml_id)) if xml_id == "missing"
        ));
    }

    #[tokio::test]
    async fn untenanted_delivery_service_by_xml_id_fails_closed() {
        let auth = authorizer();
        let resources = InMemoryResources::new().with_delivery_service(11, "shared", None);

        // C sits below the inactive B, yet the lookup must not let it through
        let err = auth.check_delivery_service(&resources, 4, "shared").await.unwrap_err();
        assert!(matches!(err, TenancyError::TenantUnassigned { resource: "deliveryservice", .. }));
        assert_eq!(err.kind(), ErrorKind::System);

        assert!(auth.check_delivery_service(&resources, 2, "shared").await.is_err());
        assert!(auth.check_delivery_service_id(&resources, 2, 11).await.is_ok());
    }

    #[tokio::test]
    async fn user_changes_check_old_and_new_tenant() {
        let auth = authorizer();
        let resources = InMemoryResources::new().with_user(100, Some(4)).with_user(101, Some(5));

        assert!(auth.check_user_change(&resources, 2, Some(100), Some(3)).await.is_ok());
        assert!(auth.check_user_change(&resources, 2, None, Some(4)).await.is_ok());
        assert!(auth.check_user_change(&resources, 2, Some(101), None).await.is_err());
        assert!(auth.check_user_change(&resources, 2, Some(100), Some(5)).await.is_err());
        assert!(matches!(
            auth.check_user_change(&resources, 2, Some(999), None).await,
            Err(TenancyError::ResourceNotFound { resource: "user", .. })
        ));
    }

    #[tokio::test]
    async fn user_without_tenant_is_not_reported_missing() {
        let auth = authorizer();
        let resources = InMemoryResources::new().with_user(102, None);

        let err = auth.check_user_change(&resources, 2, Some(102), None).await.unwrap_err();
        assert!(matches!(err, TenancyError::TenantUnassigned { resource: "user", .. }));
        assert_eq!(err.kind(), ErrorKind::System);
    }
}
