//! Integration tests for promise and grant merging.

mod common;

use apgov_connector::types::{AccessProviderState, WhoEntry};
use apgov_connector::{AccessProviderClient, FailPoint, Mutation};
use apgov_reconcile::{GrantState, WhoItem};

use common::fixtures::{broken_promise, register_sales_objects, sales_grant, user};
use common::TestContext;

const WEEK: i64 = 604_800;

async fn created_with_promise(ctx: &TestContext) -> GrantState {
    register_sales_objects(ctx).await;
    let grant = sales_grant(ctx, vec![WhoItem::user("a@x.io").promised_for(WEEK)]);
    ctx.orchestrator::<GrantState>()
        .create(grant)
        .await
        .unwrap()
        .state
}

/// Given a declared promise for a@x.io
/// And the service promoted it to a grant
/// When the access provider is read
/// Then only the declared promise is visible
#[tokio::test]
async fn test_read_back_hides_promoted_grant() {
    let ctx = TestContext::new();
    let state = created_with_promise(&ctx).await;
    let id = state.fields.id.clone().unwrap();

    let mut promoted = WhoEntry::grant(user("a@x.io"));
    promoted.expires_after = Some(WEEK);
    ctx.service.insert_who_entry(&id, promoted).await.unwrap();

    let read = ctx
        .orchestrator::<GrantState>()
        .read(state.clone())
        .await
        .unwrap();
    let read_state = read.state.unwrap();
    assert_eq!(
        read_state.fields.who,
        Some(vec![WhoItem::user("a@x.io").promised_for(WEEK)])
    );
    assert_eq!(read_state, state);
    assert!(read.fully_applied);
}

/// Given a promoted grant next to its declared promise
/// When the declaration changes and is written
/// Then the promoted grant is re-submitted once, with its expiry
/// And a second pass issues no remote mutations
#[tokio::test]
async fn test_promoted_grant_survives_writes_without_duplication() {
    let ctx = TestContext::new();
    let state = created_with_promise(&ctx).await;
    let id = state.fields.id.clone().unwrap();

    let mut promoted = WhoEntry::grant(user("a@x.io"));
    promoted.expires_after = Some(WEEK);
    ctx.service
        .insert_who_entry(&id, promoted.clone())
        .await
        .unwrap();

    let mut desired = state.clone();
    desired
        .fields
        .who
        .as_mut()
        .unwrap()
        .push(WhoItem::user("b@x.io"));

    let orchestrator = ctx.orchestrator::<GrantState>();
    let applied = orchestrator.update(state, desired.clone()).await.unwrap();
    assert!(applied.fully_applied);
    assert_eq!(applied.state, desired);

    let who = ctx.service.who_entries(&id).await;
    assert_eq!(who.len(), 3);
    assert_eq!(who.iter().filter(|e| **e == promoted).count(), 1);
    assert!(who.contains(&WhoEntry::promise(user("a@x.io"), WEEK)));
    assert!(who.contains(&WhoEntry::grant(user("b@x.io"))));

    let before = ctx.mutation_count().await;
    let again = orchestrator
        .update(applied.state.clone(), desired)
        .await
        .unwrap();
    assert_eq!(ctx.mutation_count().await, before);
    assert_eq!(again.state, applied.state);
    assert_eq!(ctx.service.who_entries(&id).await.len(), 3);
}

/// Given a declared grant for a@x.io
/// When it is created against an empty remote
/// Then the payload adds exactly that grant
#[tokio::test]
async fn test_grant_added_to_empty_membership() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let grant = sales_grant(&ctx, vec![WhoItem::user("a@x.io")]);

    let applied = ctx
        .orchestrator::<GrantState>()
        .create(grant)
        .await
        .unwrap();
    let id = applied.state.fields.id.clone().unwrap();
    assert_eq!(
        ctx.service.who_entries(&id).await,
        vec![WhoEntry::grant(user("a@x.io"))]
    );
}

/// Members added outside the declaration are revoked on the next write.
#[tokio::test]
async fn test_undeclared_member_removed_on_update() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let orchestrator = ctx.orchestrator::<GrantState>();
    let state = orchestrator
        .create(sales_grant(&ctx, vec![WhoItem::user("a@x.io")]))
        .await
        .unwrap()
        .state;
    let id = state.fields.id.clone().unwrap();
    ctx.service
        .insert_who_entry(&id, WhoEntry::grant(user("intruder@x.io")))
        .await
        .unwrap();

    let applied = orchestrator.update(state.clone(), state).await.unwrap();
    assert_eq!(
        ctx.service.who_entries(&id).await,
        vec![WhoEntry::grant(user("a@x.io"))]
    );
    assert_eq!(applied.state.fields.who, Some(vec![WhoItem::user("a@x.io")]));
}

/// Externally managed membership is neither sent nor reconstructed.
#[tokio::test]
async fn test_externally_managed_who_untouched() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let orchestrator = ctx.orchestrator::<GrantState>();

    let mut grant = sales_grant(&ctx, vec![]);
    grant.fields.who = None;
    let state = orchestrator.create(grant).await.unwrap().state;
    let id = state.fields.id.clone().unwrap();
    ctx.service
        .insert_who_entry(&id, WhoEntry::grant(user("managed@x.io")))
        .await
        .unwrap();

    let mut desired = state.clone();
    desired.fields.description = "changed".to_string();
    let applied = orchestrator.update(state, desired).await.unwrap();
    assert_eq!(applied.state.fields.who, None);
    assert_eq!(
        ctx.service.who_entries(&id).await,
        vec![WhoEntry::grant(user("managed@x.io"))]
    );
}

/// A who item naming two beneficiaries fails before any remote call.
#[tokio::test]
async fn test_invalid_who_item_rejected_before_remote_calls() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let mut both = WhoItem::user("a@x.io");
    both.group = Some("analysts".to_string());

    let diags = ctx
        .orchestrator::<GrantState>()
        .create(sales_grant(&ctx, vec![both]))
        .await
        .unwrap_err();
    assert!(diags.contains_code("VALIDATION_ERROR"));
    assert_eq!(ctx.mutation_count().await, 0);

    let diags = ctx
        .orchestrator::<GrantState>()
        .create(sales_grant(&ctx, vec![WhoItem::default()]))
        .await
        .unwrap_err();
    assert!(diags.has_errors());
    assert_eq!(ctx.mutation_count().await, 0);
}

/// A promise the service lists without a duration is reported and skipped;
/// the rest of the read still succeeds.
#[tokio::test]
async fn test_promise_without_duration_is_reported() {
    let ctx = TestContext::new();
    let state = created_with_promise(&ctx).await;
    let id = state.fields.id.clone().unwrap();
    ctx.service
        .insert_who_entry(&id, broken_promise(user("c@x.io")))
        .await
        .unwrap();

    let read = ctx
        .orchestrator::<GrantState>()
        .read(state.clone())
        .await
        .unwrap();
    assert!(!read.fully_applied);
    assert!(read.diagnostics.contains_code("INVALID_PROMISE"));
    assert_eq!(read.state.unwrap().fields.who, state.fields.who);
}

/// A who listing that fails mid-stream aborts the update before any write.
#[tokio::test]
async fn test_who_listing_failure_aborts_update() {
    let ctx = TestContext::new();
    let state = created_with_promise(&ctx).await;
    let before = ctx.mutation_count().await;

    ctx.service.fail_on(FailPoint::WhoListing).await;
    let mut desired = state.clone();
    desired.fields.state = "Inactive".to_string();
    let diags = ctx
        .orchestrator::<GrantState>()
        .update(state, desired)
        .await
        .unwrap_err();

    assert!(diags.contains_code("SEQUENCE_ERROR"));
    assert_eq!(ctx.mutation_count().await, before);
}

/// Remote membership drained through several pages is reconstructed whole.
#[tokio::test]
async fn test_paged_membership_reconstructed() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let who: Vec<WhoItem> = (0..5)
        .map(|i| WhoItem::user(format!("user{i}@x.io")))
        .collect();
    let applied = ctx
        .orchestrator::<GrantState>()
        .create(sales_grant(&ctx, who.clone()))
        .await
        .unwrap();

    let id = applied.state.fields.id.clone().unwrap();
    assert_eq!(ctx.service.list_who_items(&id).collect_all().await.unwrap().len(), 5);
    assert_eq!(applied.state.fields.who, Some(who));
    assert_eq!(
        ctx.service.mutations().await,
        vec![Mutation::CreateAccessProvider(id.clone())]
    );
    assert_eq!(
        ctx.service.access_provider(&id).await.unwrap().state,
        AccessProviderState::Active
    );
}
