mod common;

use anyhow::Result;
use common::*;
use traffic_ops_rust::tenancy::{InMemoryResources, InMemoryTenantStore, TenancyError};
use traffic_ops_rust::{ApiError, ErrorKind, TenantAuthorizer};

#[tokio::test]
async fn user_chain_is_checked_not_resource_chain() -> Result<()> {
    let authorizer = scenario_authorizer();

    // A's own chain (root, A) is active and C sits below A, so the inactive B
    // between them does not matter
    assert!(authorizer.is_authorized(A, C).await?);
    assert!(authorizer.is_authorized(A, B).await?);
    assert!(authorizer.is_authorized(ROOT, C).await?);
    Ok(())
}

#[tokio::test]
async fn inactive_link_on_user_chain_denies_even_own_tenant() -> Result<()> {
    let authorizer = scenario_authorizer();

    assert!(!authorizer.is_authorized(C, C).await?);
    assert!(!authorizer.is_authorized(B, B).await?);
    assert!(!authorizer.is_authorized(B, C).await?);
    Ok(())
}

#[tokio::test]
async fn authorization_never_flows_upward_or_sideways() -> Result<()> {
    let authorizer = scenario_authorizer();

    assert!(!authorizer.is_authorized(A, ROOT).await?);
    assert!(!authorizer.is_authorized(A, S).await?);
    assert!(!authorizer.is_authorized(S, A).await?);
    assert!(authorizer.is_authorized(S, S).await?);
    Ok(())
}

#[tokio::test]
async fn conditions_diverge_in_both_directions() -> Result<()> {
    // Active user chain, resource outside the subtree
    let store = InMemoryTenantStore::new()
        .with_tenant(1, "root", true, None)
        .with_tenant(2, "left", true, Some(1))
        .with_tenant(3, "right", false, Some(1));
    let authorizer = TenantAuthorizer::new(store);
    assert!(!authorizer.is_authorized(2, 3).await?);
    assert!(authorizer.is_authorized(1, 3).await?);

    // Resource inside the subtree, user chain broken above the user
    let store = InMemoryTenantStore::new()
        .with_tenant(1, "root", false, None)
        .with_tenant(2, "left", true, Some(1))
        .with_tenant(3, "leaf", true, Some(2));
    let authorizer = TenantAuthorizer::new(store);
    assert!(!authorizer.is_authorized(2, 3).await?);
    assert!(authorizer.resolve_accessible_tenant_ids(2).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn repeated_checks_agree() -> Result<()> {
    let authorizer = scenario_authorizer();
    for (user, resource) in [(A, C), (C, C), (A, S), (ROOT, B)] {
        let first = authorizer.is_authorized(user, resource).await?;
        let second = authorizer.is_authorized(user, resource).await?;
        assert_eq!(first, second, "user {} resource {}", user, resource);
    }
    Ok(())
}

#[tokio::test]
async fn accessible_ids_match_is_authorized() -> Result<()> {
    let authorizer = scenario_authorizer();
    let all = [ROOT, A, B, C, S];

    for user in all {
        let accessible = authorizer.resolve_accessible_tenant_ids(user).await?;
        for resource in all {
            assert_eq!(
                accessible.contains(&resource),
                authorizer.is_authorized(user, resource).await?,
                "user {} resource {}",
                user,
                resource
            );
        }
    }
    Ok(())
}

#[tokio::test]
async fn ancestors_report_activation_per_tenant() -> Result<()> {
    let chain = scenario_authorizer().resolve_all_ancestors(C).await?;
    let summary: Vec<_> = chain.iter().map(|t| (t.id, t.active)).collect();
    assert_eq!(summary, vec![(C, true), (B, false), (A, true), (ROOT, true)]);
    Ok(())
}

#[tokio::test]
async fn subtree_includes_inactive_tenants() -> Result<()> {
    let subtree = scenario_authorizer().resolve_subtree(A).await?;
    let mut ids: Vec<_> = subtree.iter().map(|t| t.id).collect();
    ids.sort();
    assert_eq!(ids, vec![A, B, C]);
    Ok(())
}

#[tokio::test]
async fn missing_user_tenant_is_a_system_error() {
    let err = scenario_authorizer().is_authorized(99, A).await.unwrap_err();
    assert!(matches!(err, TenancyError::UserTenantMissing(99)));
    assert_eq!(err.kind(), ErrorKind::System);
    assert_eq!(ApiError::from(err).status_code(), 500);
}

#[tokio::test]
async fn unknown_resource_tenant_is_denied() -> Result<()> {
    assert!(!scenario_authorizer().is_authorized(ROOT, 99).await?);
    Ok(())
}

#[tokio::test]
async fn delivery_service_checks() -> Result<()> {
    let authorizer = scenario_authorizer();
    let resources = InMemoryResources::new()
        .with_delivery_service(10, "c-video", Some(C))
        .with_delivery_service(11, "s-video", Some(S))
        .with_delivery_service(12, "shared", None);

    authorizer.check_delivery_service(&resources, A, "c-video").await?;
    assert!(authorizer.check_delivery_service(&resources, A, "shared").await.is_err());
    authorizer.check_delivery_service_id(&resources, A, 12).await?;

    let denied = authorizer
        .check_delivery_service(&resources, A, "s-video")
        .await
        .unwrap_err();
    assert_eq!(denied.kind(), ErrorKind::User);
    assert_eq!(ApiError::from(denied).status_code(), 403);

    let missing = authorizer
        .check_delivery_service_id(&resources, A, 404)
        .await
        .unwrap_err();
    assert!(matches!(missing, TenancyError::ResourceNotFound { .. }));
    assert_eq!(ApiError::from(missing).status_code(), 404);

    let unknown = authorizer
        .check_delivery_service(&resources, A, "nope")
        .await
        .unwrap_err();
    assert_eq!(unknown.kind(), ErrorKind::User);
    assert_eq!(ApiError::from(unknown).status_code(), 400);
    Ok(())
}

#[tokio::test]
async fn untenanted_delivery_service_depends_on_lookup() -> Result<()> {
    let authorizer = scenario_authorizer();
    let resources = InMemoryResources::new().with_delivery_service(12, "shared", None);

    // By id the delivery service is open to everyone
    authorizer.check_delivery_service_id(&resources, C, 12).await?;

    // By xml id the missing tenant is an inconsistency, even for a denied user
    for user in [A, C] {
        let err = authorizer
            .check_delivery_service(&resources, user, "shared")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::System);
        assert_eq!(ApiError::from(err).status_code(), 500);
    }
    Ok(())
}

#[tokio::test]
async fn user_changes_need_both_tenants() -> Result<()> {
    let authorizer = scenario_authorizer();
    let resources = InMemoryResources::new()
        .with_user(7, Some(C))
        .with_user(8, Some(S))
        .with_user(9, None);

    authorizer.check_user_change(&resources, A, Some(7), Some(B)).await?;
    authorizer.check_user_change(&resources, A, None, Some(C)).await?;

    assert!(authorizer.check_user_change(&resources, A, Some(8), None).await.is_err());
    assert!(authorizer.check_user_change(&resources, A, Some(7), Some(S)).await.is_err());
    assert!(matches!(
        authorizer.check_user_change(&resources, A, Some(10), None).await,
        Err(TenancyError::ResourceNotFound { .. })
    ));
    let err = authorizer
        .check_user_change(&resources, A, Some(9), None)
        .await
        .unwrap_err();
    assert!(matches!(err, TenancyError::TenantUnassigned { resource: "user", .. }));
    Ok(())
}
