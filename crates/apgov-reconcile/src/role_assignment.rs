//! Global role assignments.
//!
//! The service has no id for an assignment; it is addressed as
//! `<role>#<user>` (see [`crate::identifier`]).

use std::time::Duration;

use apgov_connector::types::{RoleAssignment, RoleAssignmentFilter};
use apgov_connector::{Listing, RoleClient};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::ReconcileConfig;
use crate::error::{ReconcileError, ReconcileResult};
use crate::identifier;

/// Declared role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignmentState {
    /// `<role>#<user>`. Unset until created or imported.
    pub id: Option<String>,
    pub role: String,
    pub user: String,
}

impl RoleAssignmentState {
    pub fn new(role: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            id: None,
            role: role.into(),
            user: user.into(),
        }
    }

    fn from_id(id: &str) -> ReconcileResult<Self> {
        let (role, user) = decode_assignment(id)?;
        Ok(Self {
            id: Some(id.to_string()),
            role,
            user,
        })
    }
}

/// Decode an assignment id. The service has no assignment without a role or user.
fn decode_assignment(id: &str) -> ReconcileResult<(String, String)> {
    let (role, user) = identifier::decode(id)?;
    require_parts(&role, &user)?;
    Ok((role, user))
}

fn require_parts(role: &str, user: &str) -> ReconcileResult<()> {
    if role.is_empty() || user.is_empty() {
        return Err(ReconcileError::validation(
            "roleAssignment",
            "role and user must not be empty",
        ));
    }
    Ok(())
}

pub struct RoleAssignmentReconciler<'a, C: RoleClient + ?Sized> {
    client: &'a C,
    cancel: CancellationToken,
    list_deadline: Duration,
}

impl<'a, C: RoleClient + ?Sized> RoleAssignmentReconciler<'a, C> {
    pub fn new(client: &'a C) -> Self {
        Self {
            client,
            cancel: CancellationToken::new(),
            list_deadline: ReconcileConfig::default().list_deadline(),
        }
    }

    /// Take the listing deadline from `config`.
    #[must_use]
    pub fn with_config(mut self, config: &ReconcileConfig) -> Self {
        self.list_deadline = config.list_deadline();
        self
    }

    /// Bind every listing of this reconciler to `token`.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    fn bound<T: Send + 'static>(&self, listing: Listing<T>) -> Listing<T> {
        listing
            .with_cancellation(self.cancel.child_token())
            .with_deadline(self.list_deadline)
    }

    /// Assign the role and return the state with its composite id set.
    #[instrument(skip(self), fields(role = %desired.role, user = %desired.user))]
    pub async fn create(&self, desired: RoleAssignmentState) -> ReconcileResult<RoleAssignmentState> {
        require_parts(&desired.role, &desired.user)?;
        if desired.role.contains(identifier::SEPARATOR) {
            return Err(ReconcileError::validation(
                "role",
                format!("role must not contain '{}'", identifier::SEPARATOR),
            ));
        }

        self.client
            .assign_role(&desired.role, &desired.user)
            .await
            .map_err(|e| ReconcileError::remote("assignRole", e))?;
        info!("Role assigned");

        let id = identifier::encode(&desired.role, &desired.user);
        Ok(RoleAssignmentState {
            id: Some(id),
            ..desired
        })
    }

    /// Look the assignment up. `None` means it no longer exists.
    #[instrument(skip(self))]
    pub async fn read(&self, id: &str) -> ReconcileResult<Option<RoleAssignmentState>> {
        let state = RoleAssignmentState::from_id(id)?;
        let mut listing = self.bound(
            self.client
                .list_role_assignments(RoleAssignmentFilter::exact(&state.role, &state.user)),
        );

        let mut found: Vec<RoleAssignment> = Vec::new();
        while let Some(item) = listing.next().await {
            found.push(item.map_err(|e| ReconcileError::sequence("roleAssignments", e))?);
        }

        match found.len() {
            0 => {
                warn!("Role assignment not found, dropping local state");
                Ok(None)
            }
            1 => Ok(Some(state)),
            n => Err(ReconcileError::consistency(format!(
                "{n} assignments of role {} to user {}",
                state.role, state.user
            ))),
        }
    }

    /// Unassign the role. An assignment that is already gone counts as success.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> ReconcileResult<()> {
        let (role, user) = decode_assignment(id)?;
        match self.client.unassign_role(&role, &user).await {
            Ok(()) => {
                info!("Role unassigned");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                warn!("Role assignment already gone");
                Ok(())
            }
            Err(e) => Err(ReconcileError::remote("unassignRole", e)),
        }
    }

    /// Adopt an existing assignment by id.
    pub async fn import(&self, id: &str) -> ReconcileResult<Option<RoleAssignmentState>> {
        decode_assignment(id)?;
        self.read(id).await
    }
}
