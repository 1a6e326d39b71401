//! Who-item reconciliation.
//!
//! Promises are declared by the user and promoted to grants by the service
//! when someone takes them up. A promoted grant shares its beneficiary with a
//! declared promise: it must survive every write and stay out of the declared
//! view, or each pass would either revoke it or report drift.

use std::collections::HashSet;
use std::fmt;

use apgov_connector::types::{Beneficiary, WhoEntry};
use apgov_connector::Listing;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ReconcileError, ReconcileResult};
use crate::model::WhoItem;
use crate::set_diff::{diff, SetDiff};
use crate::validation::validate_who_item;

/// Kind-independent identity of a beneficiary: `<beneficiaryType>:<beneficiaryId>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PromiseKey(String);

impl PromiseKey {
    pub fn of(beneficiary: &Beneficiary) -> Self {
        Self(format!("{}:{}", beneficiary.type_name(), beneficiary.id()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PromiseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote who entries, classified.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WhoObservation {
    /// Entries that belong to the declared view.
    pub visible: Vec<WhoEntry>,
    /// Grants promoted from a declared promise.
    pub promoted: Vec<WhoEntry>,
    /// Promises the service returned without a duration.
    pub skipped: usize,
}

impl WhoObservation {
    /// Every classified entry, as currently stored remotely.
    pub fn entries(&self) -> impl Iterator<Item = &WhoEntry> {
        self.visible.iter().chain(self.promoted.iter())
    }

    /// Rebuild the declared who view. Promoted grants are left out.
    pub fn reconstruct(&self) -> Vec<WhoItem> {
        self.visible.iter().map(WhoItem::from_entry).collect()
    }
}

/// Reconciles declared who items against the remote membership.
#[derive(Debug, Clone)]
pub struct WhoReconciler {
    declared: Vec<WhoEntry>,
    promise_keys: HashSet<PromiseKey>,
    grant_keys: HashSet<PromiseKey>,
}

impl WhoReconciler {
    /// Validate the declared items. Fails before any remote call.
    pub fn new(declared: &[WhoItem]) -> ReconcileResult<Self> {
        let declared = declared
            .iter()
            .map(validate_who_item)
            .collect::<ReconcileResult<Vec<_>>>()?;

        let mut promise_keys = HashSet::new();
        let mut grant_keys = HashSet::new();
        for entry in &declared {
            let key = PromiseKey::of(&entry.beneficiary);
            if entry.is_promise() {
                promise_keys.insert(key);
            } else {
                grant_keys.insert(key);
            }
        }

        Ok(Self {
            declared,
            promise_keys,
            grant_keys,
        })
    }

    /// Keys of the declared promises.
    pub fn promise_keys(&self) -> &HashSet<PromiseKey> {
        &self.promise_keys
    }

    /// Declared items as payload entries.
    pub fn declared(&self) -> &[WhoEntry] {
        &self.declared
    }

    fn is_promoted(&self, entry: &WhoEntry) -> bool {
        if entry.is_promise() {
            return false;
        }
        let key = PromiseKey::of(&entry.beneficiary);
        // A grant declared alongside the promise is the user's own grant.
        self.promise_keys.contains(&key) && !self.grant_keys.contains(&key)
    }

    /// Drain a who listing and classify its entries.
    ///
    /// A listing error aborts the step; nothing read so far is trusted.
    pub async fn observe(
        &self,
        mut listing: Listing<WhoEntry>,
        diagnostics: &mut Diagnostics,
    ) -> ReconcileResult<WhoObservation> {
        let mut observation = WhoObservation::default();

        while let Some(item) = listing.next().await {
            let entry = item.map_err(|e| ReconcileError::sequence("whoItems", e))?;

            if entry.is_promise() && entry.promise_duration.is_none() {
                warn!(beneficiary = %entry.beneficiary, "Promise without duration, skipping");
                diagnostics.push(
                    Diagnostic::error(
                        "INVALID_PROMISE",
                        format!("promise for {} has no duration", entry.beneficiary),
                    )
                    .with_detail("the entry was left out of the declared view"),
                );
                observation.skipped += 1;
                continue;
            }

            if self.is_promoted(&entry) {
                debug!(beneficiary = %entry.beneficiary, "Promoted promise kept out of declared view");
                observation.promoted.push(entry);
            } else {
                observation.visible.push(entry);
            }
        }

        Ok(observation)
    }

    /// Build the who payload: the declaration as authored plus every promoted
    /// grant re-submitted with its existing expiry.
    pub fn write_payload(&self, observation: &WhoObservation) -> Vec<WhoEntry> {
        let mut payload = self.declared.clone();
        for promoted in &observation.promoted {
            let key = PromiseKey::of(&promoted.beneficiary);
            if self.grant_keys.contains(&key) {
                continue;
            }
            let mut grant = WhoEntry::grant(promoted.beneficiary.clone());
            grant.expires_after = promoted.expires_after;
            grant.expires_at = promoted.expires_at;
            if !payload.contains(&grant) {
                payload.push(grant);
            }
        }
        payload
    }

    /// Beneficiaries to add and remove, ignoring grant/promise kind.
    pub fn key_diff(&self, observation: &WhoObservation) -> SetDiff<PromiseKey> {
        let declared: HashSet<PromiseKey> = self
            .declared
            .iter()
            .map(|entry| PromiseKey::of(&entry.beneficiary))
            .collect();
        let observed: HashSet<PromiseKey> = observation
            .entries()
            .map(|entry| PromiseKey::of(&entry.beneficiary))
            .collect();
        diff(&declared, &observed)
    }
}
