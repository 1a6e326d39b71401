//! Identity-store links of a data source.
//!
//! The native identity store of a data source is linked by the service and
//! never touched here.

use std::collections::HashSet;

use apgov_connector::IdentityStoreClient;
use apgov_core::{DataSourceId, IdentityStoreId};
use tracing::{debug, info, instrument, warn};

use crate::config::NativeLinkPolicy;
use crate::error::{ReconcileError, ReconcileResult};
use crate::set_diff::{diff, SetDiff};

/// Current links of a data source, split by ownership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObservedLinks {
    pub native: HashSet<IdentityStoreId>,
    pub managed: HashSet<IdentityStoreId>,
}

pub struct IdentityLinkReconciler<'a, C: IdentityStoreClient + ?Sized> {
    client: &'a C,
    policy: NativeLinkPolicy,
}

impl<'a, C: IdentityStoreClient + ?Sized> IdentityLinkReconciler<'a, C> {
    pub fn new(client: &'a C, policy: NativeLinkPolicy) -> Self {
        Self { client, policy }
    }

    async fn observe(&self, data_source: &DataSourceId) -> ReconcileResult<ObservedLinks> {
        let links = self
            .client
            .list_identity_store_links(data_source)
            .await
            .map_err(|e| ReconcileError::remote("listIdentityStoreLinks", e))?;

        let mut observed = ObservedLinks::default();
        for link in links {
            if link.native {
                observed.native.insert(link.identity_store_id);
            } else {
                observed.managed.insert(link.identity_store_id);
            }
        }
        Ok(observed)
    }

    /// Linked identity stores, the native one excluded.
    #[instrument(skip(self))]
    pub async fn read(&self, data_source: &DataSourceId) -> ReconcileResult<HashSet<IdentityStoreId>> {
        Ok(self.observe(data_source).await?.managed)
    }

    /// Bring the links of `data_source` in line with `declared`.
    ///
    /// `None` leaves the links alone. Additions are issued before removals.
    #[instrument(skip(self, declared))]
    pub async fn reconcile(
        &self,
        data_source: &DataSourceId,
        declared: Option<&HashSet<IdentityStoreId>>,
    ) -> ReconcileResult<SetDiff<IdentityStoreId>> {
        let Some(declared) = declared else {
            debug!("Identity-store links are externally managed");
            return Ok(SetDiff::default());
        };

        let observed = self.observe(data_source).await?;
        let named_native: Vec<&IdentityStoreId> = declared.intersection(&observed.native).collect();
        if !named_native.is_empty() {
            match self.policy {
                NativeLinkPolicy::Reject => {
                    return Err(ReconcileError::validation(
                        "identityStores",
                        format!(
                            "{} is the native identity store of {data_source} and cannot be declared",
                            named_native[0]
                        ),
                    ));
                }
                NativeLinkPolicy::Ignore => {
                    debug!(count = named_native.len(), "Ignoring declared native identity store");
                }
            }
        }

        let declared: HashSet<IdentityStoreId> =
            declared.difference(&observed.native).cloned().collect();
        let plan = diff(&declared, &observed.managed);

        let mut to_add: Vec<&IdentityStoreId> = plan.to_add.iter().collect();
        to_add.sort();
        for identity_store in to_add {
            self.client
                .add_identity_store_link(data_source, identity_store)
                .await
                .map_err(|e| ReconcileError::remote("addIdentityStoreLink", e))?;
            info!(identity_store_id = %identity_store, "Identity store linked");
        }

        let mut to_remove: Vec<&IdentityStoreId> = plan.to_remove.iter().collect();
        to_remove.sort();
        for identity_store in to_remove {
            match self
                .client
                .remove_identity_store_link(data_source, identity_store)
                .await
            {
                Ok(()) => info!(identity_store_id = %identity_store, "Identity store unlinked"),
                Err(e) if e.is_not_found() => {
                    warn!(identity_store_id = %identity_store, "Identity store link already gone");
                }
                Err(e) => return Err(ReconcileError::remote("removeIdentityStoreLink", e)),
            }
        }

        Ok(plan)
    }
}
