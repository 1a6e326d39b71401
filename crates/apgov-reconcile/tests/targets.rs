//! Integration tests for what-item projection per kind.

mod common;

use apgov_connector::types::{AccessProviderKind, RemoteWhatItem, WhatEntry};
use apgov_reconcile::{FilterState, GrantState, MaskState, PurposeState, WhatItem};

use common::fixtures::{
    register_sales_objects, remote_access_provider, remote_object, sales_grant, CUSTOMERS, EMAIL,
    ORDERS,
};
use common::TestContext;

#[tokio::test]
async fn test_unresolvable_target_is_partially_applied() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let mut grant = sales_grant(&ctx, vec![]);
    grant
        .fields
        .what
        .as_mut()
        .unwrap()
        .push(WhatItem::data_object("SALES.PUBLIC.MISSING").into());

    let applied = ctx
        .orchestrator::<GrantState>()
        .create(grant)
        .await
        .unwrap();

    assert!(!applied.fully_applied);
    assert!(applied.diagnostics.contains_code("PARTIAL_APPLY"));
    let id = applied.state.fields.id.clone().unwrap();
    assert_eq!(ctx.service.what_items(&id).await.len(), 1);
    assert_eq!(
        applied.state.fields.what,
        Some(vec![WhatItem::data_object(ORDERS)
            .with_permissions(["SELECT"])
            .into()])
    );
}

#[tokio::test]
async fn test_grant_targets_other_access_providers() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    ctx.service
        .seed_access_provider(
            remote_access_provider("ap-base", AccessProviderKind::Grant, None),
            vec![],
            vec![],
        )
        .await;

    let mut grant = sales_grant(&ctx, vec![]);
    grant
        .fields
        .what
        .as_mut()
        .unwrap()
        .push(WhatItem::access_provider("ap-base"));

    let applied = ctx
        .orchestrator::<GrantState>()
        .create(grant.clone())
        .await
        .unwrap();
    assert!(applied.fully_applied);
    assert_eq!(applied.state.fields.what, grant.fields.what);

    let id = applied.state.fields.id.clone().unwrap();
    assert!(ctx
        .service
        .what_items(&id)
        .await
        .iter()
        .any(|item| matches!(item, RemoteWhatItem::AccessProvider { id } if id.as_str() == "ap-base")));
}

#[tokio::test]
async fn test_mask_round_trip_keeps_columns() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let mut mask = MaskState::new("email mask", ctx.data_source.clone());
    mask.mask_type = Some("SHA256".to_string());
    mask.fields.what = Some(vec![WhatItem::data_object(EMAIL).into()]);

    let orchestrator = ctx.orchestrator::<MaskState>();
    let applied = orchestrator.create(mask.clone()).await.unwrap();
    assert_eq!(applied.state.mask_type.as_deref(), Some("SHA256"));
    assert_eq!(applied.state.fields.what, mask.fields.what);

    let before = ctx.mutation_count().await;
    orchestrator
        .update(applied.state.clone(), applied.state)
        .await
        .unwrap();
    assert_eq!(ctx.mutation_count().await, before);
}

#[tokio::test]
async fn test_filter_with_two_remote_tables_is_inconsistent() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let mut filter = FilterState::new("eu rows", ctx.data_source.clone(), "region = 'EU'");
    filter.fields.what = Some(vec![WhatItem::data_object(ORDERS).into()]);

    let orchestrator = ctx.orchestrator::<FilterState>();
    let state = orchestrator.create(filter).await.unwrap().state;
    let id = state.fields.id.clone().unwrap();
    ctx.service
        .insert_what_item(&id, remote_object("do-extra", CUSTOMERS, &ctx.data_source))
        .await
        .unwrap();

    let diags = orchestrator.read(state).await.unwrap_err();
    assert!(diags.contains_code("CONSISTENCY_VIOLATION"));
}

#[tokio::test]
async fn test_filter_update_replaces_its_table() {
    let ctx = TestContext::new();
    let ids = register_sales_objects(&ctx).await;
    let mut filter = FilterState::new("eu rows", ctx.data_source.clone(), "region = 'EU'");
    filter.fields.what = Some(vec![WhatItem::data_object(ORDERS).into()]);

    let orchestrator = ctx.orchestrator::<FilterState>();
    let state = orchestrator.create(filter).await.unwrap().state;

    let mut desired = state.clone();
    desired.fields.what = Some(vec![WhatItem::data_object(CUSTOMERS).into()]);
    desired.filter_policy = "region = 'EU' AND active".to_string();
    let applied = orchestrator.update(state, desired.clone()).await.unwrap();
    assert_eq!(applied.state, desired);

    let id = applied.state.fields.id.clone().unwrap();
    let remote: Vec<WhatEntry> = ctx
        .service
        .what_items(&id)
        .await
        .iter()
        .map(WhatEntry::from)
        .collect();
    assert!(matches!(&remote[..], [WhatEntry::DataObject { id, .. }] if id == &ids[1]));
}

#[tokio::test]
async fn test_purpose_rejects_data_objects() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let mut purpose = PurposeState::new("Marketing");
    purpose.fields.what = Some(vec![WhatItem::data_object(ORDERS).into()]);

    let diags = ctx
        .orchestrator::<PurposeState>()
        .create(purpose)
        .await
        .unwrap_err();
    assert!(diags.contains_code("VALIDATION_ERROR"));
    assert_eq!(ctx.mutation_count().await, 0);
}
