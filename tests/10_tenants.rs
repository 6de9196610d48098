mod common;

use anyhow::Result;
use chrono::{Duration, SubsecRound};

use cdn_tenancy_core::api::ApiError;
use cdn_tenancy_core::concurrency::{ReadPreconditions, WritePreconditions};
use cdn_tenancy_core::models::{NewTenant, TenantId, TenantUpdate, ROOT_TENANT_ID};
use cdn_tenancy_core::services::CoreServices;
use cdn_tenancy_core::store::{ResourceStore, StoreError};
use cdn_tenancy_core::CoreError;

use common::Fixture;

fn names(views: &[cdn_tenancy_core::models::TenantView]) -> Vec<&str> {
    views.iter().map(|v| v.tenant.name.as_str()).collect()
}

#[tokio::test]
async fn test_list_is_sorted_by_name_with_parent_names() -> Result<()> {
    let fx = Fixture::seed().await?;

    let tenants = fx
        .services
        .tenants
        .list(&fx.as_root(), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");

    assert_eq!(names(&tenants), vec!["root", "tenant1", "tenant2", "tenant3", "tenant4"]);
    assert_eq!(tenants[0].parent_name, None);
    assert_eq!(tenants[3].parent_name.as_deref(), Some("tenant2"));
    Ok(())
}

#[tokio::test]
async fn test_list_is_scoped_to_subtree() -> Result<()> {
    let fx = Fixture::seed().await?;

    let tenants = fx
        .services
        .tenants
        .list(&fx.as_tenant("tenant1"), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(names(&tenants), vec!["tenant1", "tenant2", "tenant3"]);

    let tenants = fx
        .services
        .tenants
        .list(&fx.as_tenant("tenant4"), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(names(&tenants), vec!["tenant4"]);
    Ok(())
}

#[tokio::test]
async fn test_root_cannot_be_deactivated() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .update(
            &fx.as_root(),
            ROOT_TENANT_ID,
            TenantUpdate {
                name: Some("root".to_string()),
                parent_id: Some(ROOT_TENANT_ID),
                active: Some(false),
            },
            &WritePreconditions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::ImmutableRoot));
    assert_eq!(ApiError::from(err).status_code(), 400);

    let root = fx
        .services
        .tenants
        .get(&fx.as_root(), ROOT_TENANT_ID, &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("root tenant");
    assert!(root.tenant.active);
    assert!(fx
        .services
        .tenants
        .delete(&fx.as_root(), ROOT_TENANT_ID, &WritePreconditions::default())
        .await
        .is_err());
    Ok(())
}

#[tokio::test]
async fn test_reparent_under_descendant_is_a_cycle() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .update(
            &fx.as_root(),
            fx.tenant("tenant1"),
            TenantUpdate {
                parent_id: Some(fx.tenant("tenant3")),
                ..TenantUpdate::default()
            },
            &WritePreconditions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Cycle { .. }), "got {:?}", err);

    // self-parenting is the shortest cycle
    let err = fx
        .services
        .tenants
        .update(
            &fx.as_root(),
            fx.tenant("tenant2"),
            TenantUpdate {
                parent_id: Some(fx.tenant("tenant2")),
                ..TenantUpdate::default()
            },
            &WritePreconditions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Cycle { .. }), "got {:?}", err);
    Ok(())
}

#[tokio::test]
async fn test_reparent_moves_the_subtree() -> Result<()> {
    let fx = Fixture::seed().await?;

    let moved = fx
        .services
        .tenants
        .update(
            &fx.as_root(),
            fx.tenant("tenant2"),
            TenantUpdate {
                parent_id: Some(fx.tenant("tenant4")),
                ..TenantUpdate::default()
            },
            &WritePreconditions::default(),
        )
        .await?;
    assert_eq!(moved.parent_name.as_deref(), Some("tenant4"));

    let tenants = fx
        .services
        .tenants
        .list(&fx.as_tenant("tenant4"), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(names(&tenants), vec!["tenant2", "tenant3", "tenant4"]);
    Ok(())
}

#[tokio::test]
async fn test_requester_cannot_reparent_outside_its_subtree() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .update(
            &fx.as_tenant("tenant2"),
            fx.tenant("tenant3"),
            TenantUpdate {
                parent_id: Some(fx.tenant("tenant4")),
                ..TenantUpdate::default()
            },
            &WritePreconditions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn test_delete_with_children_is_rejected() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .delete(&fx.as_root(), fx.tenant("tenant2"), &WritePreconditions::default())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Tenant 'tenant2' has child tenants. Please update these child tenants and retry."
    );
    assert_eq!(err.kind(), "HAS_CHILDREN");
    Ok(())
}

#[tokio::test]
async fn test_delete_owner_of_delivery_services_is_rejected() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .delete(&fx.as_root(), fx.tenant("tenant3"), &WritePreconditions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::InUse { .. }), "got {:?}", err);
    Ok(())
}

#[tokio::test]
async fn test_bottom_up_delete_empties_the_tree() -> Result<()> {
    let fx = Fixture::seed().await?;
    let root = fx.as_root();

    for xml_id in ["ds1", "ds2", "ds3"] {
        fx.services
            .delivery_services
            .delete(&root, fx.ds(xml_id), &WritePreconditions::default())
            .await?;
    }
    for name in ["tenant3", "tenant2", "tenant1", "tenant4"] {
        let deleted = fx
            .services
            .tenants
            .delete(&root, fx.tenant(name), &WritePreconditions::default())
            .await?;
        assert_eq!(deleted.name, name);
    }

    let tenants = fx
        .services
        .tenants
        .list(&root, &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(names(&tenants), vec!["root"]);
    Ok(())
}

#[tokio::test]
async fn test_inactive_tenant_stays_visible_to_ancestor() -> Result<()> {
    let fx = Fixture::seed().await?;
    fx.set_tenant_active("tenant2", false).await?;

    let tenant1 = fx.as_tenant("tenant1");
    let tenant2 = fx
        .services
        .tenants
        .get(&tenant1, fx.tenant("tenant2"), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("tenant2");
    assert!(!tenant2.tenant.active);

    let mut update = TenantUpdate::from_tenant(&tenant2.tenant);
    update.active = Some(true);
    let reactivated = fx
        .services
        .tenants
        .update(&tenant1, fx.tenant("tenant2"), update, &WritePreconditions::default())
        .await?;
    assert!(reactivated.tenant.active);
    Ok(())
}

#[tokio::test]
async fn test_inactive_requester_is_denied() -> Result<()> {
    let fx = Fixture::seed().await?;
    fx.set_tenant_active("tenant3", false).await?;

    let err = fx
        .services
        .tenants
        .list(&fx.as_tenant("tenant3"), &ReadPreconditions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::TenantInactive { tenant } if tenant == fx.tenant("tenant3")));
    assert_eq!(ApiError::from(err).status_code(), 403);
    Ok(())
}

#[tokio::test]
async fn test_unrelated_and_missing_tenants_look_the_same() -> Result<()> {
    let fx = Fixture::seed().await?;
    let tenant4 = fx.as_tenant("tenant4");

    let unrelated = fx
        .services
        .tenants
        .get(&tenant4, fx.tenant("tenant1"), &ReadPreconditions::default())
        .await
        .unwrap_err();
    let missing = fx
        .services
        .tenants
        .get(&tenant4, TenantId(9999), &ReadPreconditions::default())
        .await
        .unwrap_err();
    assert!(matches!(unrelated, CoreError::Forbidden));
    assert!(matches!(missing, CoreError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn test_duplicate_name_is_rejected() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .create(
            &fx.as_root(),
            NewTenant {
                name: "tenant2".to_string(),
                parent_id: fx.tenant("tenant4"),
                active: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::AlreadyExists { .. }), "got {:?}", err);
    assert_eq!(ApiError::from(err).status_code(), 409);
    Ok(())
}

#[tokio::test]
async fn test_create_under_foreign_parent_is_forbidden() -> Result<()> {
    let fx = Fixture::seed().await?;

    let err = fx
        .services
        .tenants
        .create(
            &fx.as_tenant("tenant4"),
            NewTenant {
                name: "tenant5".to_string(),
                parent_id: fx.tenant("tenant1"),
                active: true,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Forbidden));
    Ok(())
}

#[tokio::test]
async fn test_conditional_get_and_stale_update() -> Result<()> {
    let fx = Fixture::seed().await?;
    let root = fx.as_root();
    let id = fx.tenant("tenant4");

    let fetched = fx
        .services
        .tenants
        .get(&root, id, &ReadPreconditions::default())
        .await?;
    let last_modified = fetched.last_modified().expect("stamp");
    let token = fetched.token().expect("token");

    let later = ReadPreconditions {
        if_modified_since: Some(last_modified.trunc_subsecs(0) + Duration::seconds(1)),
    };
    assert!(fx.services.tenants.get(&root, id, &later).await?.is_not_modified());

    fx.tick(2);
    fx.services
        .tenants
        .update(
            &root,
            id,
            TenantUpdate {
                name: Some("tenant4-renamed".to_string()),
                ..TenantUpdate::default()
            },
            &WritePreconditions::if_match(token.clone()),
        )
        .await?;

    // the earlier bound no longer covers the rename
    assert!(!fx.services.tenants.get(&root, id, &later).await?.is_not_modified());

    let err = fx
        .services
        .tenants
        .update(
            &root,
            id,
            TenantUpdate {
                name: Some("tenant4-again".to_string()),
                ..TenantUpdate::default()
            },
            &WritePreconditions::if_match(token),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::PreconditionFailed(_)));
    assert_eq!(ApiError::from(err).status_code(), 412);

    let current = fx
        .services
        .tenants
        .find_by_name(&root, "tenant4-renamed")
        .await?;
    assert_eq!(current.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_hierarchy_depth_is_bounded() -> Result<()> {
    let fx = Fixture::seed().await?;
    // tenant3 already sits three levels below the root
    let services = CoreServices::with_max_depth(fx.store.clone(), 3);
    let root = fx.as_root();

    let err = services
        .tenants
        .create(
            &root,
            NewTenant {
                name: "tenant5".to_string(),
                parent_id: fx.tenant("tenant3"),
                active: true,
            },
        )
        .await
        .unwrap_err();
    assert!(
        matches!(err, CoreError::Validation { ref field, .. } if field == "parentId"),
        "got {:?}",
        err
    );
    assert!(fx.store.tenants().find_by_key("tenant5").await?.is_none());

    // tenant1 brings two levels with it, which do not fit under tenant4
    let err = services
        .tenants
        .update(
            &root,
            fx.tenant("tenant1"),
            TenantUpdate {
                parent_id: Some(fx.tenant("tenant4")),
                ..TenantUpdate::default()
            },
            &WritePreconditions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::Validation { .. }), "got {:?}", err);

    // tenant2 brings one, so tenant3 lands exactly on the bound
    let moved = services
        .tenants
        .update(
            &root,
            fx.tenant("tenant2"),
            TenantUpdate {
                parent_id: Some(fx.tenant("tenant4")),
                ..TenantUpdate::default()
            },
            &WritePreconditions::default(),
        )
        .await?;
    assert_eq!(moved.parent_name.as_deref(), Some("tenant4"));

    // the tree still loads for every later request
    let tenants = services
        .tenants
        .list(&root, &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(tenants.len(), 5);
    let cdns = services
        .cdns
        .list(&fx.as_tenant("tenant3"), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(cdns.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_parent_gaining_a_child_after_the_check_is_not_deleted() -> Result<()> {
    let fx = Fixture::seed().await?;
    let id = fx.tenant("tenant4");

    // the stamp a delete would have read before the child appeared
    let read = fx.store.tenants().get(id).await?.expect("tenant4");
    fx.services
        .tenants
        .create(
            &fx.as_root(),
            NewTenant {
                name: "tenant5".to_string(),
                parent_id: id,
                active: true,
            },
        )
        .await?;

    let err = fx
        .store
        .tenants()
        .delete_if_unmodified(id, read.last_updated)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::HasChildren { .. }), "got {:?}", err);
    assert_eq!(
        CoreError::from(err).to_string(),
        "Tenant 'tenant4' has child tenants. Please update these child tenants and retry."
    );

    // nothing was orphaned
    let tenants = fx
        .services
        .tenants
        .list(&fx.as_root(), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(
        names(&tenants),
        vec!["root", "tenant1", "tenant2", "tenant3", "tenant4", "tenant5"]
    );
    Ok(())
}

#[tokio::test]
async fn test_child_of_a_deleted_parent_is_not_stored() -> Result<()> {
    let fx = Fixture::seed().await?;
    let root = fx.as_root();
    let id = fx.tenant("tenant4");

    // a create that validated tenant4 before it was deleted
    let mut orphan = fx.store.tenants().get(id).await?.expect("tenant4");
    orphan.name = "tenant5".to_string();
    orphan.parent_id = id;
    fx.services
        .tenants
        .delete(&root, id, &WritePreconditions::default())
        .await?;

    let err = fx.store.tenants().insert(orphan).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound { .. }), "got {:?}", err);

    let tenants = fx
        .services
        .tenants
        .list(&root, &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(names(&tenants), vec!["root", "tenant1", "tenant2", "tenant3"]);
    Ok(())
}

#[tokio::test]
async fn test_crossing_reparents_cannot_form_a_cycle() -> Result<()> {
    let fx = Fixture::seed().await?;
    let tenant1 = fx.tenant("tenant1");
    let tenant4 = fx.tenant("tenant4");

    // both moves were checked against the same tree
    let mut first = fx.store.tenants().get(tenant4).await?.expect("tenant4");
    let mut second = fx.store.tenants().get(tenant1).await?.expect("tenant1");
    let (first_stamp, second_stamp) = (first.last_updated, second.last_updated);
    first.parent_id = tenant1;
    second.parent_id = tenant4;

    fx.store.tenants().replace_if_unmodified(first_stamp, first).await?;
    let err = fx
        .store
        .tenants()
        .replace_if_unmodified(second_stamp, second)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Conflict { .. }), "got {:?}", err);
    assert_eq!(CoreError::from(err).kind(), "PRECONDITION_FAILED");

    let tenants = fx
        .services
        .tenants
        .list(&fx.as_root(), &ReadPreconditions::default())
        .await?
        .into_value()
        .expect("full listing");
    assert_eq!(tenants.len(), 5);
    Ok(())
}
