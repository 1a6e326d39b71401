//! In-memory governance service.
//!
//! Implements every collaborator trait against process-local state. Used by
//! the test suites and for dry runs. Listings page lazily over the shared
//! state, every mutation is recorded, and individual operations can be made
//! to fail to exercise partial-failure paths.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use apgov_core::{AccessProviderId, DataObjectId, DataSourceId, IdentityStoreId};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::config::ClientSettings;
use crate::error::{ConnectorError, ConnectorResult};
use crate::listing::{Listing, Page, PageRequest};
use crate::traits::{AccessProviderClient, DataObjectResolver, IdentityStoreClient, RoleClient};
use crate::types::{
    AccessProviderInput, AccessProviderState, DataObjectRef, IdentityStoreLink,
    RemoteAccessProvider, RemoteWhatItem, RoleAssignment, RoleAssignmentFilter, WhatEntry,
    WhoEntry,
};

/// A remote mutation, recorded in call order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    CreateAccessProvider(AccessProviderId),
    UpdateAccessProvider(AccessProviderId),
    DeleteAccessProvider(AccessProviderId),
    SetState(AccessProviderId, AccessProviderState),
    AddLink(DataSourceId, IdentityStoreId),
    RemoveLink(DataSourceId, IdentityStoreId),
    AssignRole(String, String),
    UnassignRole(String, String),
}

/// Operations that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    Create,
    Update,
    SetState,
    WhoListing,
    WhatListing,
    AddLink,
    RemoveLink,
}

#[derive(Debug, Clone)]
struct StoredAccessProvider {
    remote: RemoteAccessProvider,
    who: Vec<WhoEntry>,
    what: Vec<RemoteWhatItem>,
}

#[derive(Debug, Default)]
struct RemoteState {
    access_providers: HashMap<AccessProviderId, StoredAccessProvider>,
    data_objects: HashMap<DataObjectId, DataObjectRef>,
    links: HashMap<DataSourceId, Vec<IdentityStoreLink>>,
    role_assignments: Vec<RoleAssignment>,
    mutations: Vec<Mutation>,
    failures: HashSet<FailPoint>,
}

impl RemoteState {
    fn check(&self, point: FailPoint) -> ConnectorResult<()> {
        if !self.failures.contains(&point) {
            return Ok(());
        }
        // Listings fail the way a dropped connection does mid-stream.
        let message = format!("injected failure at {point:?}");
        match point {
            FailPoint::WhoListing | FailPoint::WhatListing => {
                Err(ConnectorError::connection_failed(message))
            }
            _ => Err(ConnectorError::ServiceUnavailable { message }),
        }
    }

    fn stored(&self, id: &AccessProviderId) -> ConnectorResult<&StoredAccessProvider> {
        self.access_providers
            .get(id)
            .ok_or_else(|| ConnectorError::not_found("AccessProvider", id.as_str()))
    }

    fn stored_mut(&mut self, id: &AccessProviderId) -> ConnectorResult<&mut StoredAccessProvider> {
        self.access_providers
            .get_mut(id)
            .ok_or_else(|| ConnectorError::not_found("AccessProvider", id.as_str()))
    }

    fn materialize_what(&self, entries: Vec<WhatEntry>) -> ConnectorResult<Vec<RemoteWhatItem>> {
        entries
            .into_iter()
            .map(|entry| match entry {
                WhatEntry::DataObject {
                    id,
                    permissions,
                    global_permissions,
                } => {
                    let object = self
                        .data_objects
                        .get(&id)
                        .cloned()
                        .ok_or_else(|| ConnectorError::rejected(format!("unknown data object {id}")))?;
                    Ok(RemoteWhatItem::DataObject {
                        object,
                        permissions,
                        global_permissions,
                    })
                }
                WhatEntry::AccessProvider { id } => {
                    if !self.access_providers.contains_key(&id) {
                        return Err(ConnectorError::rejected(format!(
                            "unknown access provider {id}"
                        )));
                    }
                    Ok(RemoteWhatItem::AccessProvider { id })
                }
            })
            .collect()
    }
}

/// In-memory implementation of every collaborator trait.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGovernanceService {
    state: Arc<RwLock<RemoteState>>,
    settings: ClientSettings,
}

impl InMemoryGovernanceService {
    /// Create an empty service with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty service with custom settings (page size, listing deadline).
    #[must_use]
    pub fn with_settings(settings: ClientSettings) -> Self {
        Self {
            state: Arc::default(),
            settings,
        }
    }

    /// Register a data object so its full name can be resolved.
    pub async fn register_data_object(
        &self,
        data_source: &DataSourceId,
        full_name: &str,
    ) -> DataObjectId {
        let id = DataObjectId::new(format!("do-{}", Uuid::new_v4().simple()));
        self.state.write().await.data_objects.insert(
            id.clone(),
            DataObjectRef {
                id: id.clone(),
                full_name: full_name.to_string(),
                data_source: data_source.clone(),
            },
        );
        id
    }

    /// Insert an access provider directly, bypassing the mutation log.
    pub async fn seed_access_provider(
        &self,
        remote: RemoteAccessProvider,
        who: Vec<WhoEntry>,
        what: Vec<RemoteWhatItem>,
    ) {
        self.state.write().await.access_providers.insert(
            remote.id.clone(),
            StoredAccessProvider { remote, who, what },
        );
    }

    /// Add a who entry behind the engine's back, e.g. a promise being promoted.
    pub async fn insert_who_entry(
        &self,
        id: &AccessProviderId,
        entry: WhoEntry,
    ) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        state.stored_mut(id)?.who.push(entry);
        Ok(())
    }

    /// Add a what item behind the engine's back.
    pub async fn insert_what_item(
        &self,
        id: &AccessProviderId,
        item: RemoteWhatItem,
    ) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        state.stored_mut(id)?.what.push(item);
        Ok(())
    }

    /// Remove an access provider entirely, so lookups report `NotFound`.
    pub async fn purge_access_provider(&self, id: &AccessProviderId) {
        self.state.write().await.access_providers.remove(id);
    }

    /// Replace the identity-store links of a data source.
    pub async fn set_identity_store_links(
        &self,
        data_source: &DataSourceId,
        links: Vec<IdentityStoreLink>,
    ) {
        self.state
            .write()
            .await
            .links
            .insert(data_source.clone(), links);
    }

    /// Insert a role assignment without the uniqueness check of `assign_role`.
    pub async fn insert_role_assignment(&self, assignment: RoleAssignment) {
        self.state.write().await.role_assignments.push(assignment);
    }

    /// Make an operation fail until [`Self::clear_failures`] is called.
    pub async fn fail_on(&self, point: FailPoint) {
        self.state.write().await.failures.insert(point);
    }

    pub async fn clear_failures(&self) {
        self.state.write().await.failures.clear();
    }

    /// Current remote view of an access provider.
    pub async fn access_provider(&self, id: &AccessProviderId) -> Option<RemoteAccessProvider> {
        self.state
            .read()
            .await
            .access_providers
            .get(id)
            .map(|stored| stored.remote.clone())
    }

    /// Current who entries of an access provider.
    pub async fn who_entries(&self, id: &AccessProviderId) -> Vec<WhoEntry> {
        self.state
            .read()
            .await
            .access_providers
            .get(id)
            .map(|stored| stored.who.clone())
            .unwrap_or_default()
    }

    /// Current what items of an access provider.
    pub async fn what_items(&self, id: &AccessProviderId) -> Vec<RemoteWhatItem> {
        self.state
            .read()
            .await
            .access_providers
            .get(id)
            .map(|stored| stored.what.clone())
            .unwrap_or_default()
    }

    /// Current identity-store links of a data source.
    pub async fn identity_store_links(&self, data_source: &DataSourceId) -> Vec<IdentityStoreLink> {
        self.state
            .read()
            .await
            .links
            .get(data_source)
            .cloned()
            .unwrap_or_default()
    }

    /// Current role assignments.
    pub async fn role_assignments(&self) -> Vec<RoleAssignment> {
        self.state.read().await.role_assignments.clone()
    }

    /// Every mutation issued so far, in order.
    pub async fn mutations(&self) -> Vec<Mutation> {
        self.state.read().await.mutations.clone()
    }

    pub async fn mutation_count(&self) -> usize {
        self.state.read().await.mutations.len()
    }

    /// Page over a slice of items produced by `select` on each fetch.
    fn page_over<T, F>(&self, select: F) -> Listing<T>
    where
        T: Clone + Send + Sync + 'static,
        F: Fn(&RemoteState) -> ConnectorResult<Vec<T>> + Send + Sync + 'static,
    {
        let state = self.state.clone();
        let select = Arc::new(select);
        // A zero page size would never advance the cursor.
        let page_size = self.settings.page_size.max(1);
        Listing::paginated(page_size, move |request: PageRequest| {
            let state = state.clone();
            let select = select.clone();
            async move {
                let guard = state.read().await;
                let all = (*select)(&*guard)?;
                let offset = match request.cursor.as_deref() {
                    Some(cursor) => cursor.parse::<usize>().map_err(|_| {
                        ConnectorError::invalid_response(format!("bad cursor '{cursor}'"))
                    })?,
                    None => 0,
                };
                let end = (offset + request.limit).min(all.len());
                let items = all.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
                Ok(Page {
                    items,
                    next_cursor: (end < all.len()).then(|| end.to_string()),
                })
            }
        })
        .with_deadline(self.settings.list_deadline())
    }
}

#[async_trait]
impl AccessProviderClient for InMemoryGovernanceService {
    async fn create_access_provider(
        &self,
        input: AccessProviderInput,
    ) -> ConnectorResult<RemoteAccessProvider> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Create)?;

        let what = state.materialize_what(input.what.unwrap_or_default())?;
        let remote = RemoteAccessProvider {
            id: AccessProviderId::new(format!("ap-{}", Uuid::new_v4().simple())),
            kind: input.kind,
            name: input.name,
            description: input.description,
            state: AccessProviderState::Active,
            data_source: input.data_source,
            mask_type: input.mask_type,
            filter_policy: input.filter_policy,
        };
        state.access_providers.insert(
            remote.id.clone(),
            StoredAccessProvider {
                remote: remote.clone(),
                who: input.who.unwrap_or_default(),
                what,
            },
        );
        state
            .mutations
            .push(Mutation::CreateAccessProvider(remote.id.clone()));
        Ok(remote)
    }

    async fn update_access_provider(
        &self,
        id: &AccessProviderId,
        input: AccessProviderInput,
    ) -> ConnectorResult<RemoteAccessProvider> {
        let mut state = self.state.write().await;
        state.check(FailPoint::Update)?;
        state.stored(id)?;

        let what = match input.what {
            Some(entries) => Some(state.materialize_what(entries)?),
            None => None,
        };
        let stored = state.stored_mut(id)?;
        stored.remote.name = input.name;
        stored.remote.description = input.description;
        stored.remote.data_source = input.data_source;
        stored.remote.mask_type = input.mask_type;
        stored.remote.filter_policy = input.filter_policy;
        if let Some(who) = input.who {
            stored.who = who;
        }
        if let Some(what) = what {
            stored.what = what;
        }
        let remote = stored.remote.clone();
        state
            .mutations
            .push(Mutation::UpdateAccessProvider(id.clone()));
        Ok(remote)
    }

    async fn delete_access_provider(&self, id: &AccessProviderId) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        let stored = state.stored_mut(id)?;
        if stored.remote.state == AccessProviderState::Deleted {
            return Err(ConnectorError::not_found("AccessProvider", id.as_str()));
        }
        // Soft delete: the service keeps deleted entities visible for a while.
        stored.remote.state = AccessProviderState::Deleted;
        state
            .mutations
            .push(Mutation::DeleteAccessProvider(id.clone()));
        Ok(())
    }

    async fn get_access_provider(
        &self,
        id: &AccessProviderId,
    ) -> ConnectorResult<RemoteAccessProvider> {
        let state = self.state.read().await;
        Ok(state.stored(id)?.remote.clone())
    }

    async fn set_access_provider_state(
        &self,
        id: &AccessProviderId,
        target: AccessProviderState,
    ) -> ConnectorResult<RemoteAccessProvider> {
        if !target.is_settable() {
            return Err(ConnectorError::rejected(format!(
                "state {target} cannot be set directly"
            )));
        }
        let mut state = self.state.write().await;
        state.check(FailPoint::SetState)?;
        let stored = state.stored_mut(id)?;
        stored.remote.state = target;
        let remote = stored.remote.clone();
        state.mutations.push(Mutation::SetState(id.clone(), target));
        Ok(remote)
    }

    fn list_who_items(&self, id: &AccessProviderId) -> Listing<WhoEntry> {
        let id = id.clone();
        self.page_over(move |state| {
            state.check(FailPoint::WhoListing)?;
            Ok(state.stored(&id)?.who.clone())
        })
    }

    fn list_what_items(&self, id: &AccessProviderId) -> Listing<RemoteWhatItem> {
        let id = id.clone();
        self.page_over(move |state| {
            state.check(FailPoint::WhatListing)?;
            Ok(state.stored(&id)?.what.clone())
        })
    }
}

#[async_trait]
impl DataObjectResolver for InMemoryGovernanceService {
    async fn resolve_object_id(
        &self,
        full_name: &str,
        data_source: &DataSourceId,
    ) -> ConnectorResult<DataObjectId> {
        let state = self.state.read().await;
        state
            .data_objects
            .values()
            .find(|object| object.full_name == full_name && &object.data_source == data_source)
            .map(|object| object.id.clone())
            .ok_or_else(|| {
                ConnectorError::not_found("DataObject", format!("{data_source}/{full_name}"))
            })
    }
}

#[async_trait]
impl IdentityStoreClient for InMemoryGovernanceService {
    async fn list_identity_store_links(
        &self,
        data_source: &DataSourceId,
    ) -> ConnectorResult<Vec<IdentityStoreLink>> {
        let state = self.state.read().await;
        Ok(state.links.get(data_source).cloned().unwrap_or_default())
    }

    async fn add_identity_store_link(
        &self,
        data_source: &DataSourceId,
        identity_store: &IdentityStoreId,
    ) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::AddLink)?;
        let links = state.links.entry(data_source.clone()).or_default();
        if !links.iter().any(|l| &l.identity_store_id == identity_store) {
            links.push(IdentityStoreLink {
                identity_store_id: identity_store.clone(),
                native: false,
            });
        }
        state
            .mutations
            .push(Mutation::AddLink(data_source.clone(), identity_store.clone()));
        Ok(())
    }

    async fn remove_identity_store_link(
        &self,
        data_source: &DataSourceId,
        identity_store: &IdentityStoreId,
    ) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        state.check(FailPoint::RemoveLink)?;
        let links = state.links.entry(data_source.clone()).or_default();
        let before = links.len();
        links.retain(|l| &l.identity_store_id != identity_store);
        if links.len() == before {
            return Err(ConnectorError::not_found(
                "IdentityStoreLink",
                format!("{data_source}/{identity_store}"),
            ));
        }
        state.mutations.push(Mutation::RemoveLink(
            data_source.clone(),
            identity_store.clone(),
        ));
        Ok(())
    }
}

#[async_trait]
impl RoleClient for InMemoryGovernanceService {
    async fn assign_role(&self, role: &str, user: &str) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        let assignment = RoleAssignment {
            role: role.to_string(),
            user: user.to_string(),
        };
        if state.role_assignments.contains(&assignment) {
            return Err(ConnectorError::rejected(format!(
                "role {role} already assigned to {user}"
            )));
        }
        state.role_assignments.push(assignment);
        state
            .mutations
            .push(Mutation::AssignRole(role.to_string(), user.to_string()));
        Ok(())
    }

    async fn unassign_role(&self, role: &str, user: &str) -> ConnectorResult<()> {
        let mut state = self.state.write().await;
        let position = state
            .role_assignments
            .iter()
            .position(|a| a.role == role && a.user == user)
            .ok_or_else(|| ConnectorError::not_found("RoleAssignment", format!("{role}/{user}")))?;
        state.role_assignments.remove(position);
        state
            .mutations
            .push(Mutation::UnassignRole(role.to_string(), user.to_string()));
        Ok(())
    }

    fn list_role_assignments(&self, filter: RoleAssignmentFilter) -> Listing<RoleAssignment> {
        self.page_over(move |state| {
            Ok(state
                .role_assignments
                .iter()
                .filter(|a| filter.matches(a))
                .cloned()
                .collect())
        })
    }
}
