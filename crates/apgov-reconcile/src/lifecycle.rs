//! Access provider lifecycle.
//!
//! The service creates and updates an access provider in one call and
//! changes its state in another. The two are not transactional: a failed
//! state change leaves the created or updated entity in place and is
//! reported as a mismatch.

use std::fmt;

use apgov_connector::types::{AccessProviderInput, AccessProviderState, RemoteAccessProvider};
use apgov_connector::AccessProviderClient;
use apgov_core::AccessProviderId;
use tracing::{debug, info, instrument, warn};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ReconcileError, ReconcileResult};

/// Where an access provider stands from the engine's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Not yet created by the engine.
    Unmanaged,
    /// Created, state change still pending.
    Created,
    Active,
    Inactive,
    /// Gone remotely; the local state is dropped.
    Deleted,
}

impl LifecycleState {
    /// Classify a remote lookup result. `None` means the service reported NotFound.
    pub fn of(remote: Option<&RemoteAccessProvider>) -> Self {
        match remote.map(|r| r.state) {
            None | Some(AccessProviderState::Deleted) => LifecycleState::Deleted,
            Some(AccessProviderState::Active) => LifecycleState::Active,
            Some(AccessProviderState::Inactive) => LifecycleState::Inactive,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self, LifecycleState::Active | LifecycleState::Inactive)
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LifecycleState::Unmanaged => "unmanaged",
            LifecycleState::Created => "created",
            LifecycleState::Active => "active",
            LifecycleState::Inactive => "inactive",
            LifecycleState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Sequences primary mutations and state changes against the client.
pub struct Lifecycle<'a, C: AccessProviderClient + ?Sized> {
    client: &'a C,
}

impl<'a, C: AccessProviderClient + ?Sized> Lifecycle<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self { client }
    }

    /// Create the access provider, then move it to `declared` if the service
    /// created it in another state.
    #[instrument(skip(self, input, diagnostics), fields(kind = %input.kind, name = %input.name))]
    pub async fn create(
        &self,
        input: AccessProviderInput,
        declared: AccessProviderState,
        diagnostics: &mut Diagnostics,
    ) -> ReconcileResult<RemoteAccessProvider> {
        let created = self
            .client
            .create_access_provider(input)
            .await
            .map_err(|e| ReconcileError::remote("createAccessProvider", e))?;
        info!(
            access_provider_id = %created.id,
            lifecycle = %LifecycleState::Created,
            "Access provider created"
        );

        Ok(self.converge_state(created, declared, diagnostics).await)
    }

    /// Update the access provider. Its state is never touched by the update
    /// call itself; a differing declared state is applied afterwards.
    #[instrument(skip(self, input, observed, diagnostics))]
    pub async fn update(
        &self,
        id: &AccessProviderId,
        input: Option<AccessProviderInput>,
        observed: RemoteAccessProvider,
        declared: AccessProviderState,
        diagnostics: &mut Diagnostics,
    ) -> ReconcileResult<RemoteAccessProvider> {
        let current = match input {
            Some(input) => {
                let updated = self
                    .client
                    .update_access_provider(id, input)
                    .await
                    .map_err(|e| ReconcileError::remote("updateAccessProvider", e))?;
                info!("Access provider updated");
                updated
            }
            None => {
                debug!("Payload unchanged, update skipped");
                observed
            }
        };

        Ok(self.converge_state(current, declared, diagnostics).await)
    }

    /// Issue a state change when `declared` differs from the current state.
    ///
    /// A failure becomes a diagnostic; the returned entity keeps its actual state.
    async fn converge_state(
        &self,
        current: RemoteAccessProvider,
        declared: AccessProviderState,
        diagnostics: &mut Diagnostics,
    ) -> RemoteAccessProvider {
        if current.state == declared {
            return current;
        }

        match self
            .client
            .set_access_provider_state(&current.id, declared)
            .await
        {
            Ok(changed) => {
                info!(
                    access_provider_id = %current.id,
                    from = %current.state,
                    to = %declared,
                    "Access provider state changed"
                );
                changed
            }
            Err(e) => {
                warn!(
                    access_provider_id = %current.id,
                    error = %e,
                    "State change failed after primary mutation"
                );
                let error = ReconcileError::remote("setAccessProviderState", e);
                diagnostics.push(
                    Diagnostic::error(
                        "STATE_MISMATCH",
                        format!(
                            "access provider {} is {} but {} was declared",
                            current.id, current.state, declared
                        ),
                    )
                    .with_detail(error.to_string()),
                );
                current
            }
        }
    }

    /// Look up the access provider. NotFound and `Deleted` both yield `None`.
    #[instrument(skip(self))]
    pub async fn observe(&self, id: &AccessProviderId) -> ReconcileResult<Option<RemoteAccessProvider>> {
        match self.client.get_access_provider(id).await {
            Ok(remote) if remote.state == AccessProviderState::Deleted => {
                debug!("Access provider is deleted remotely");
                Ok(None)
            }
            Ok(remote) => Ok(Some(remote)),
            Err(e) if e.is_not_found() => {
                warn!("Access provider not found, dropping local state");
                Ok(None)
            }
            Err(e) => Err(ReconcileError::remote("getAccessProvider", e)),
        }
    }

    /// Delete the access provider. NotFound counts as success.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &AccessProviderId) -> ReconcileResult<()> {
        match self.client.delete_access_provider(id).await {
            Ok(()) => {
                info!("Access provider deleted");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("Access provider already gone");
                Ok(())
            }
            Err(e) => Err(ReconcileError::remote("deleteAccessProvider", e)),
        }
    }
}
