//! Integration tests for create/read/update/delete sequencing.

mod common;

use std::sync::Arc;

use apgov_connector::types::{AccessProviderKind, AccessProviderState, RemoteAccessProvider};
use apgov_connector::{FailPoint, Mutation};
use apgov_reconcile::{
    GrantState, HasAccessProviderFields, MaskState, PurposeState, ReadExtension, ReconcileConfig,
    ReconcileError, ReconcileResult, WhoItem,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::fixtures::{register_sales_objects, remote_access_provider, sales_grant};
use common::TestContext;

async fn created(ctx: &TestContext) -> GrantState {
    register_sales_objects(ctx).await;
    ctx.orchestrator::<GrantState>()
        .create(sales_grant(ctx, vec![WhoItem::user("a@x.io")]))
        .await
        .unwrap()
        .state
}

#[tokio::test]
async fn test_create_inactive_issues_separate_state_change() {
    let ctx = TestContext::new();
    register_sales_objects(&ctx).await;
    let mut grant = sales_grant(&ctx, vec![]);
    grant.fields.state = "inactive".to_string();

    let applied = ctx
        .orchestrator::<GrantState>()
        .create(grant)
        .await
        .unwrap();
    let id = applied.state.fields.id.clone().unwrap();

    assert_eq!(
        ctx.service.mutations().await,
        vec![
            Mutation::CreateAccessProvider(id.clone()),
            Mutation::SetState(id.clone(), AccessProviderState::Inactive),
        ]
    );
    // The declared spelling is kept when it means the remote state.
    assert_eq!(applied.state.fields.state, "inactive");
}

#[tokio::test]
async fn test_default_created_state_from_config() {
    let ctx = TestContext::with_config(
        ReconcileConfig::default().with_default_created_state(AccessProviderState::Inactive),
    );
    let applied = ctx
        .orchestrator::<PurposeState>()
        .create(PurposeState::new("Marketing"))
        .await
        .unwrap();
    let id = applied.state.fields.id.clone().unwrap();
    assert_eq!(
        ctx.service.access_provider(&id).await.unwrap().state,
        AccessProviderState::Inactive
    );
}

#[tokio::test]
async fn test_invalid_state_string_rejected_without_remote_calls() {
    let ctx = TestContext::new();
    let mut purpose = PurposeState::new("Marketing");
    purpose.fields.state = "Enabled".to_string();

    let diags = ctx
        .orchestrator::<PurposeState>()
        .create(purpose)
        .await
        .unwrap_err();
    assert!(diags.contains_code("VALIDATION_ERROR"));
    assert_eq!(ctx.mutation_count().await, 0);
}

#[tokio::test]
async fn test_state_change_only_update_skips_update_call() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    let id = state.fields.id.clone().unwrap();
    let before = ctx.mutation_count().await;

    let mut desired = state.clone();
    desired.fields.state = "Inactive".to_string();
    let applied = ctx
        .orchestrator::<GrantState>()
        .update(state, desired)
        .await
        .unwrap();

    let mutations = ctx.service.mutations().await;
    assert_eq!(
        mutations[before..].to_vec(),
        vec![Mutation::SetState(id, AccessProviderState::Inactive)]
    );
    assert_eq!(applied.state.fields.state, "Inactive");
}

#[tokio::test]
async fn test_update_without_skipping_always_writes() {
    let ctx = TestContext::with_config(ReconcileConfig::default().with_skip_unchanged_updates(false));
    let state = created(&ctx).await;
    let id = state.fields.id.clone().unwrap();
    let before = ctx.mutation_count().await;

    ctx.orchestrator::<GrantState>()
        .update(state.clone(), state)
        .await
        .unwrap();
    assert_eq!(
        ctx.service.mutations().await[before..].to_vec(),
        vec![Mutation::UpdateAccessProvider(id)]
    );
}

#[tokio::test]
async fn test_failed_state_change_is_reported_not_fatal() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    ctx.service.fail_on(FailPoint::SetState).await;

    let mut desired = state.clone();
    desired.fields.state = "Inactive".to_string();
    desired.fields.description = "now inactive".to_string();
    let applied = ctx
        .orchestrator::<GrantState>()
        .update(state, desired)
        .await
        .unwrap();

    assert!(!applied.fully_applied);
    assert!(applied.diagnostics.contains_code("STATE_MISMATCH"));
    assert_eq!(applied.state.fields.description, "now inactive");
    assert_eq!(applied.state.fields.state, "Active");
}

#[tokio::test]
async fn test_read_not_found_clears_state() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    ctx.service
        .purge_access_provider(state.fields.id.as_ref().unwrap())
        .await;

    let read = ctx
        .orchestrator::<GrantState>()
        .read(state)
        .await
        .unwrap();
    assert!(read.state.is_none());
    assert!(read.diagnostics.is_empty());
}

#[tokio::test]
async fn test_delete_then_read_and_delete_again() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    let orchestrator = ctx.orchestrator::<GrantState>();

    assert!(orchestrator.delete(state.clone()).await.unwrap().is_empty());
    assert!(orchestrator.read(state.clone()).await.unwrap().state.is_none());
    assert!(orchestrator.delete(state).await.is_ok());
}

#[tokio::test]
async fn test_update_of_deleted_access_provider_fails() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    let orchestrator = ctx.orchestrator::<GrantState>();
    orchestrator.delete(state.clone()).await.unwrap();

    let diags = orchestrator.update(state.clone(), state).await.unwrap_err();
    assert!(diags.contains_code("NOT_FOUND"));
}

#[tokio::test]
async fn test_kind_mismatch_is_consistency_violation() {
    let ctx = TestContext::new();
    ctx.service
        .seed_access_provider(
            remote_access_provider("ap-grant", AccessProviderKind::Grant, None),
            vec![],
            vec![],
        )
        .await;

    let mut mask = MaskState::new("email mask", ctx.data_source.clone());
    mask.fields.id = Some("ap-grant".into());
    let diags = ctx
        .orchestrator::<MaskState>()
        .read(mask)
        .await
        .unwrap_err();
    assert!(diags.contains_code("CONSISTENCY_VIOLATION"));
}

#[tokio::test]
async fn test_cancelled_pass_aborts_listings() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    let token = CancellationToken::new();
    token.cancel();

    let diags = ctx
        .orchestrator::<GrantState>()
        .with_cancellation(token)
        .read(state)
        .await
        .unwrap_err();
    assert!(diags.contains_code("SEQUENCE_ERROR"));
    assert!(diags.iter().any(|d| d.summary.contains("cancelled")));
}

struct OwnerTag;

#[async_trait]
impl ReadExtension<GrantState> for OwnerTag {
    fn name(&self) -> &str {
        "owner-tag"
    }

    async fn extend(
        &self,
        remote: &RemoteAccessProvider,
        state: &mut GrantState,
    ) -> ReconcileResult<()> {
        state.fields.description = format!("{} (owner: {})", remote.description, remote.id);
        Ok(())
    }
}

struct Failing;

#[async_trait]
impl ReadExtension<GrantState> for Failing {
    fn name(&self) -> &str {
        "failing"
    }

    async fn extend(&self, _remote: &RemoteAccessProvider, state: &mut GrantState) -> ReconcileResult<()> {
        state.fields_mut().name = "clobbered".to_string();
        Err(ReconcileError::validation("owner", "unknown owner"))
    }
}

#[tokio::test]
async fn test_read_extensions_run_in_order_and_failures_are_isolated() {
    let ctx = TestContext::new();
    let state = created(&ctx).await;
    let id = state.fields.id.clone().unwrap();

    let read = ctx
        .orchestrator::<GrantState>()
        .with_extension(Arc::new(Failing))
        .with_extension(Arc::new(OwnerTag))
        .read(state.clone())
        .await
        .unwrap();

    let read_state = read.state.unwrap();
    assert_eq!(read_state.fields.name, state.fields.name);
    assert_eq!(
        read_state.fields.description,
        format!("Read access to sales orders (owner: {id})")
    );
    assert!(!read.fully_applied);
    assert_eq!(read.diagnostics.len(), 1);
}
