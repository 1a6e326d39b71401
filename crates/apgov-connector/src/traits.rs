//! Collaborator capability traits
//!
//! The reconciliation engine talks to the governance service only through
//! these traits. A transport implements the capabilities it supports; the
//! in-memory remote in [`crate::memory`] implements all of them.

use apgov_core::{AccessProviderId, DataObjectId, DataSourceId, IdentityStoreId};
use async_trait::async_trait;

use crate::error::ConnectorResult;
use crate::listing::Listing;
use crate::types::{
    AccessProviderInput, AccessProviderState, IdentityStoreLink, RemoteAccessProvider,
    RemoteWhatItem, RoleAssignment, RoleAssignmentFilter, WhoEntry,
};

/// Access provider CRUD, state changes and member/target listings.
#[async_trait]
pub trait AccessProviderClient: Send + Sync {
    /// Create an access provider. The service assigns the id and the initial state.
    async fn create_access_provider(
        &self,
        input: AccessProviderInput,
    ) -> ConnectorResult<RemoteAccessProvider>;

    /// Update an access provider. Never changes its state.
    ///
    /// A `Some` who/what set replaces the remote set; omitted entries are revoked.
    async fn update_access_provider(
        &self,
        id: &AccessProviderId,
        input: AccessProviderInput,
    ) -> ConnectorResult<RemoteAccessProvider>;

    /// Delete an access provider.
    async fn delete_access_provider(&self, id: &AccessProviderId) -> ConnectorResult<()>;

    /// Fetch an access provider. Fails with `NotFound` if it does not exist.
    async fn get_access_provider(
        &self,
        id: &AccessProviderId,
    ) -> ConnectorResult<RemoteAccessProvider>;

    /// Activate or deactivate an access provider.
    async fn set_access_provider_state(
        &self,
        id: &AccessProviderId,
        state: AccessProviderState,
    ) -> ConnectorResult<RemoteAccessProvider>;

    /// List the who entries of an access provider, grants and promises alike.
    fn list_who_items(&self, id: &AccessProviderId) -> Listing<WhoEntry>;

    /// List the what entries of an access provider.
    fn list_what_items(&self, id: &AccessProviderId) -> Listing<RemoteWhatItem>;
}

/// Resolution of data object full names to remote ids.
#[async_trait]
pub trait DataObjectResolver: Send + Sync {
    /// Resolve `full_name` inside `data_source`. Fails with `NotFound` if unknown.
    async fn resolve_object_id(
        &self,
        full_name: &str,
        data_source: &DataSourceId,
    ) -> ConnectorResult<DataObjectId>;
}

/// Links between data sources and identity stores.
#[async_trait]
pub trait IdentityStoreClient: Send + Sync {
    /// All links of a data source, the native one included.
    async fn list_identity_store_links(
        &self,
        data_source: &DataSourceId,
    ) -> ConnectorResult<Vec<IdentityStoreLink>>;

    async fn add_identity_store_link(
        &self,
        data_source: &DataSourceId,
        identity_store: &IdentityStoreId,
    ) -> ConnectorResult<()>;

    async fn remove_identity_store_link(
        &self,
        data_source: &DataSourceId,
        identity_store: &IdentityStoreId,
    ) -> ConnectorResult<()>;
}

/// Global role assignments.
#[async_trait]
pub trait RoleClient: Send + Sync {
    async fn assign_role(&self, role: &str, user: &str) -> ConnectorResult<()>;

    /// Fails with `NotFound` if the assignment does not exist.
    async fn unassign_role(&self, role: &str, user: &str) -> ConnectorResult<()>;

    fn list_role_assignments(&self, filter: RoleAssignmentFilter) -> Listing<RoleAssignment>;
}

