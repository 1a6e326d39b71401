//! Create, read, update and delete for declared access providers.
//!
//! One orchestrator serves one kind. Every operation returns either the
//! rebuilt declared state with any non-fatal diagnostics, or the diagnostics
//! that ended it.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use apgov_connector::types::{AccessProviderInput, RemoteAccessProvider, RemoteWhatItem, WhatEntry};
use apgov_connector::{AccessProviderClient, DataObjectResolver, Listing};
use apgov_core::{AccessProviderId, ApgovError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::config::ReconcileConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{ReconcileError, ReconcileResult};
use crate::extensions::{ReadExtension, ReadExtensions};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::model::{HasAccessProviderFields, WhatCardinality};
use crate::validation::{parse_declared_state, validate_access_provider};
use crate::what::{observe_what, reconstruct_what, WhatProjector};
use crate::who::{WhoObservation, WhoReconciler};

/// Outcome of a successful operation.
#[derive(Debug, Clone)]
pub struct Applied<S> {
    /// State rebuilt from the remote after the operation.
    pub state: S,
    /// Non-fatal problems met on the way.
    pub diagnostics: Diagnostics,
    /// False when some part of the declaration could not be applied.
    pub fully_applied: bool,
}

impl<S> Applied<S> {
    fn new(state: S, diagnostics: Diagnostics) -> Self {
        let fully_applied = !diagnostics.has_errors();
        Self {
            state,
            diagnostics,
            fully_applied,
        }
    }
}

/// Payload sets computed before a write, with what they were computed from.
struct WritePlan {
    input: AccessProviderInput,
    who_observed: Option<WhoObservation>,
    what_observed: Option<Vec<RemoteWhatItem>>,
}

/// Reconciles declared access providers of kind `S`.
pub struct AccessProviderOrchestrator<C, S: HasAccessProviderFields> {
    client: Arc<C>,
    config: ReconcileConfig,
    extensions: ReadExtensions<S>,
    cancel: CancellationToken,
}

impl<C, S> AccessProviderOrchestrator<C, S>
where
    C: AccessProviderClient + DataObjectResolver + 'static,
    S: HasAccessProviderFields,
{
    pub fn new(client: Arc<C>, config: ReconcileConfig) -> Self {
        Self {
            client,
            config,
            extensions: ReadExtensions::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Register a post-read extension. Extensions run in registration order.
    #[must_use]
    pub fn with_extension(mut self, extension: Arc<dyn ReadExtension<S>>) -> Self {
        self.extensions.register(extension);
        self
    }

    /// Bind every listing of this orchestrator to `token`.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &ReconcileConfig {
        &self.config
    }

    fn lifecycle(&self) -> Lifecycle<'_, C> {
        Lifecycle::new(self.client.as_ref())
    }

    fn bound<T: Send + 'static>(&self, listing: Listing<T>) -> Listing<T> {
        listing
            .with_cancellation(self.cancel.child_token())
            .with_deadline(self.config.list_deadline())
    }

    /// Create the declared access provider.
    #[instrument(skip(self, desired), fields(kind = %S::KIND, name = %desired.fields().name))]
    pub async fn create(&self, desired: S) -> Result<Applied<S>, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        match self.try_create(desired, &mut diagnostics).await {
            Ok(state) => Ok(Applied::new(state, diagnostics)),
            Err(e) => Err(fail(diagnostics, &e)),
        }
    }

    /// Refresh `prior` from the remote. `None` means the access provider is gone.
    #[instrument(skip(self, prior), fields(kind = %S::KIND, access_provider_id = ?prior.fields().id))]
    pub async fn read(&self, prior: S) -> Result<Applied<Option<S>>, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        match self.try_read(prior, &mut diagnostics).await {
            Ok(state) => Ok(Applied::new(state, diagnostics)),
            Err(e) => Err(fail(diagnostics, &e)),
        }
    }

    /// Move the remote from `prior` to `desired`.
    #[instrument(skip(self, prior, desired), fields(kind = %S::KIND, access_provider_id = ?prior.fields().id))]
    pub async fn update(&self, prior: S, desired: S) -> Result<Applied<S>, Diagnostics> {
        let mut diagnostics = Diagnostics::new();
        match self.try_update(prior, desired, &mut diagnostics).await {
            Ok(state) => Ok(Applied::new(state, diagnostics)),
            Err(e) => Err(fail(diagnostics, &e)),
        }
    }

    /// Delete the access provider. An already deleted one counts as success.
    #[instrument(skip(self, state), fields(kind = %S::KIND, access_provider_id = ?state.fields().id))]
    pub async fn delete(&self, state: S) -> Result<Diagnostics, Diagnostics> {
        let diagnostics = Diagnostics::new();
        let Some(id) = state.fields().id.clone() else {
            debug!("Access provider was never created, nothing to delete");
            return Ok(diagnostics);
        };
        match self.lifecycle().delete(&id).await {
            Ok(()) => Ok(diagnostics),
            Err(e) => Err(fail(diagnostics, &e)),
        }
    }

    async fn try_create(&self, desired: S, diagnostics: &mut Diagnostics) -> ReconcileResult<S> {
        if let Some(id) = &desired.fields().id {
            return Err(ReconcileError::validation(
                "id",
                format!("access provider {id} already exists, update it instead"),
            ));
        }
        let declared_state =
            validate_access_provider(&desired, self.config.default_created_state)?;
        debug!(lifecycle = %LifecycleState::Unmanaged, declared = %declared_state, "Creating access provider");

        let plan = self.plan_write(&desired, None, diagnostics).await?;
        let created = self
            .lifecycle()
            .create(plan.input, declared_state, diagnostics)
            .await?;

        let mut state = desired;
        state.fields_mut().id = Some(created.id.clone());
        self.rebuild(&created, state, diagnostics).await
    }

    async fn try_read(&self, prior: S, diagnostics: &mut Diagnostics) -> ReconcileResult<Option<S>> {
        let id = require_id(&prior)?;
        let Some(remote) = self.lifecycle().observe(&id).await? else {
            info!(access_provider_id = %id, lifecycle = %LifecycleState::Deleted, "Access provider removed");
            return Ok(None);
        };
        check_kind::<S>(&remote)?;
        self.rebuild(&remote, prior, diagnostics).await.map(Some)
    }

    async fn try_update(
        &self,
        prior: S,
        desired: S,
        diagnostics: &mut Diagnostics,
    ) -> ReconcileResult<S> {
        let id = match &desired.fields().id {
            Some(id) => id.clone(),
            None => require_id(&prior)?,
        };
        let declared_state =
            validate_access_provider(&desired, self.config.default_created_state)?;

        let remote = self.lifecycle().observe(&id).await?.ok_or_else(|| {
            ReconcileError::from(ApgovError::not_found(
                "AccessProvider",
                Some(id.to_string()),
            ))
        })?;
        check_kind::<S>(&remote)?;

        let plan = self.plan_write(&desired, Some(&id), diagnostics).await?;
        let unchanged = self.config.skip_unchanged_updates && plan.matches(&remote);
        let updated = self
            .lifecycle()
            .update(
                &id,
                (!unchanged).then_some(plan.input),
                remote,
                declared_state,
                diagnostics,
            )
            .await?;

        let mut state = desired;
        state.fields_mut().id = Some(id);
        self.rebuild(&updated, state, diagnostics).await
    }

    /// Compute the write payload. For an existing access provider the who
    /// listing is drained first, so promoted promises are carried over.
    async fn plan_write(
        &self,
        desired: &S,
        existing: Option<&AccessProviderId>,
        diagnostics: &mut Diagnostics,
    ) -> ReconcileResult<WritePlan> {
        let fields = desired.fields();
        let mut input = AccessProviderInput::new(S::KIND, fields.name.clone());
        input.description = fields.description.clone();
        desired.fill_input(&mut input);

        let mut who_observed = None;
        if let Some(items) = &fields.who {
            let reconciler = WhoReconciler::new(items)?;
            let observation = match existing {
                Some(id) => {
                    reconciler
                        .observe(self.bound(self.client.list_who_items(id)), diagnostics)
                        .await?
                }
                None => WhoObservation::default(),
            };
            let plan = reconciler.key_diff(&observation);
            debug!(
                to_add = plan.to_add.len(),
                to_remove = plan.to_remove.len(),
                promoted = observation.promoted.len(),
                "Who plan"
            );
            input.who = Some(reconciler.write_payload(&observation));
            who_observed = Some(observation);
        }

        let mut what_observed = None;
        if let Some(items) = &fields.what {
            let projected = WhatProjector::new(self.client.as_ref())
                .project(items, desired.default_data_source(), diagnostics)
                .await;
            if let Some(id) = existing {
                let listing = self.bound(self.client.list_what_items(id));
                what_observed = Some(observe_what(listing, WhatCardinality::Many).await?);
            }
            input.what = Some(projected.entries);
        }

        Ok(WritePlan {
            input,
            who_observed,
            what_observed,
        })
    }

    /// Rebuild declared state from the remote entity and its listings.
    async fn rebuild(
        &self,
        remote: &RemoteAccessProvider,
        prior: S,
        diagnostics: &mut Diagnostics,
    ) -> ReconcileResult<S> {
        let mut state = prior;
        state.absorb_remote(remote);

        let default_state = self.config.default_created_state;
        let fields = state.fields_mut();
        fields.id = Some(remote.id.clone());
        fields.name = remote.name.clone();
        fields.description = remote.description.clone();
        // Keep the declared spelling when it already means the remote state.
        if parse_declared_state(&fields.state, default_state).ok() != Some(remote.state) {
            fields.state = remote.state.as_str().to_string();
        }

        if let Some(items) = state.fields().who.clone() {
            let reconciler = WhoReconciler::new(&items)?;
            let observation = reconciler
                .observe(self.bound(self.client.list_who_items(&remote.id)), diagnostics)
                .await?;
            state.fields_mut().who = Some(observation.reconstruct());
        }

        if state.fields().what.is_some() {
            let listing = self.bound(self.client.list_what_items(&remote.id));
            let items = observe_what(listing, S::what_cardinality()).await?;
            let rebuilt = reconstruct_what(&items, state.default_data_source());
            state.fields_mut().what = Some(rebuilt);
        }

        Ok(self.extensions.run(remote, state, diagnostics).await)
    }
}

impl WritePlan {
    /// Whether sending this payload would leave the remote as it is.
    fn matches(&self, remote: &RemoteAccessProvider) -> bool {
        let input = &self.input;
        let fields_match = input.kind == remote.kind
            && input.name == remote.name
            && input.description == remote.description
            && input.data_source == remote.data_source
            && input.mask_type == remote.mask_type
            && input.filter_policy == remote.filter_policy;
        if !fields_match {
            return false;
        }

        let who_match = match (&input.who, &self.who_observed) {
            (Some(payload), Some(observed)) => {
                observed.skipped == 0 && same_elements(payload, observed.entries())
            }
            (None, _) => true,
            (Some(_), None) => false,
        };

        let what_match = match (&input.what, &self.what_observed) {
            (Some(payload), Some(observed)) => {
                let observed: Vec<WhatEntry> = observed.iter().map(WhatEntry::from).collect();
                same_elements(payload, observed.iter())
            }
            (None, _) => true,
            (Some(_), None) => false,
        };

        who_match && what_match
    }
}

/// Order-insensitive multiset comparison.
fn same_elements<'a, T, I>(expected: &'a [T], actual: I) -> bool
where
    T: Eq + Hash + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut counts: HashMap<&T, isize> = HashMap::new();
    for item in expected {
        *counts.entry(item).or_default() += 1;
    }
    for item in actual {
        *counts.entry(item).or_default() -= 1;
    }
    counts.values().all(|count| *count == 0)
}

fn require_id<S: HasAccessProviderFields>(state: &S) -> ReconcileResult<AccessProviderId> {
    state
        .fields()
        .id
        .clone()
        .ok_or_else(|| ReconcileError::validation("id", "access provider has not been created"))
}

fn check_kind<S: HasAccessProviderFields>(remote: &RemoteAccessProvider) -> ReconcileResult<()> {
    if remote.kind != S::KIND {
        return Err(ReconcileError::consistency(format!(
            "access provider {} is a {}, expected a {}",
            remote.id,
            remote.kind,
            S::KIND
        )));
    }
    Ok(())
}

fn fail(mut diagnostics: Diagnostics, error: &ReconcileError) -> Diagnostics {
    diagnostics.push_error(error);
    diagnostics
}

#[cfg(test)]
mod tests {
    use apgov_connector::types::{Beneficiary, WhoEntry};

    use super::*;

    #[test]
    fn test_same_elements_ignores_order() {
        let a = vec![1, 2, 2, 3];
        assert!(same_elements(&a, [3, 2, 1, 2].iter()));
        assert!(!same_elements(&a, [3, 2, 1].iter()));
        assert!(!same_elements(&a, [3, 2, 1, 2, 2].iter()));
        assert!(same_elements::<i32, _>(&[], [].iter()));
    }

    #[test]
    fn test_same_elements_on_who_entries() {
        let grant = WhoEntry::grant(Beneficiary::User("a@x.io".to_string()));
        let promise = WhoEntry::promise(Beneficiary::User("a@x.io".to_string()), 60);
        assert!(same_elements(
            &[grant.clone(), promise.clone()],
            [promise.clone(), grant.clone()].iter()
        ));
        assert!(!same_elements(&[grant], [promise].iter()));
    }
}
