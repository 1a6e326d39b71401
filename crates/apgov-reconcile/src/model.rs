//! Declared state.
//!
//! Every access provider kind shares [`AccessProviderFields`]; kind-specific
//! structs add their own fields and expose the shared ones through
//! [`HasAccessProviderFields`].

use std::collections::BTreeSet;

use apgov_connector::types::{
    AccessProviderInput, AccessProviderKind, Beneficiary, RemoteAccessProvider, WhoEntry,
    WhoItemKind,
};
use apgov_core::{AccessProviderId, DataSourceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{ReconcileError, ReconcileResult};

/// A declared membership entry.
///
/// Exactly one of `user`, `group` and `access_provider` must be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct WhoItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_provider: Option<AccessProviderId>,

    #[serde(default)]
    pub kind: WhoItemKind,

    /// Seconds a promise lasts once promoted. Required for promises.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "promise duration must be at least 1 second"))]
    pub promise_duration: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, message = "expiry must be at least 1 second"))]
    pub expires_after: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl WhoItem {
    pub fn user(id: impl Into<String>) -> Self {
        Self {
            user: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Self {
            group: Some(id.into()),
            ..Self::default()
        }
    }

    pub fn access_provider(id: impl Into<AccessProviderId>) -> Self {
        Self {
            access_provider: Some(id.into()),
            ..Self::default()
        }
    }

    /// Turn this item into a promise lasting `duration_secs`.
    #[must_use]
    pub fn promised_for(mut self, duration_secs: i64) -> Self {
        self.kind = WhoItemKind::Promise;
        self.promise_duration = Some(duration_secs);
        self
    }

    /// The single beneficiary this item names.
    pub fn beneficiary(&self) -> ReconcileResult<Beneficiary> {
        match (&self.user, &self.group, &self.access_provider) {
            (Some(user), None, None) => Ok(Beneficiary::User(user.clone())),
            (None, Some(group), None) => Ok(Beneficiary::Group(group.clone())),
            (None, None, Some(ap)) => Ok(Beneficiary::AccessProvider(ap.clone())),
            (None, None, None) => Err(ReconcileError::validation(
                "who",
                "one of user, group or accessProvider must be set",
            )),
            _ => Err(ReconcileError::validation(
                "who",
                "only one of user, group or accessProvider may be set",
            )),
        }
    }

    /// Rebuild a declared item from a remote entry.
    pub fn from_entry(entry: &WhoEntry) -> Self {
        let mut item = match &entry.beneficiary {
            Beneficiary::User(id) => Self::user(id.clone()),
            Beneficiary::Group(id) => Self::group(id.clone()),
            Beneficiary::AccessProvider(id) => Self::access_provider(id.clone()),
        };
        item.kind = entry.kind;
        item.promise_duration = entry.promise_duration;
        item.expires_after = entry.expires_after;
        item.expires_at = entry.expires_at;
        item
    }
}

/// A declared data object target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatDataObject {
    /// Dotted full name, e.g. `SALES.PUBLIC.ORDERS`.
    pub full_name: String,

    #[serde(default)]
    pub permissions: BTreeSet<String>,

    #[serde(default)]
    pub global_permissions: BTreeSet<String>,

    /// Data source of this object when it differs from the access provider's.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceId>,
}

impl WhatDataObject {
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            permissions: BTreeSet::new(),
            global_permissions: BTreeSet::new(),
            data_source: None,
        }
    }

    #[must_use]
    pub fn with_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_global_permissions<I, P>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.global_permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn in_data_source(mut self, data_source: impl Into<DataSourceId>) -> Self {
        self.data_source = Some(data_source.into());
        self
    }
}

/// A declared target entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum WhatItem {
    DataObject(WhatDataObject),
    AccessProvider { id: AccessProviderId },
}

impl WhatItem {
    pub fn data_object(full_name: impl Into<String>) -> WhatDataObject {
        WhatDataObject::new(full_name)
    }

    pub fn access_provider(id: impl Into<AccessProviderId>) -> Self {
        Self::AccessProvider { id: id.into() }
    }

    pub fn is_data_object(&self) -> bool {
        matches!(self, Self::DataObject(_))
    }
}

impl From<WhatDataObject> for WhatItem {
    fn from(object: WhatDataObject) -> Self {
        Self::DataObject(object)
    }
}

/// How many targets a kind governs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WhatCardinality {
    Many,
    /// Exactly one target, e.g. the table a filter applies to.
    Single,
}

/// Fields shared by every access provider kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccessProviderFields {
    /// Remote id. Unset until the access provider has been created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AccessProviderId>,

    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: String,

    #[serde(default)]
    #[validate(length(max = 2000, message = "description cannot exceed 2000 characters"))]
    pub description: String,

    /// Declared lifecycle state, `Active` or `Inactive` in any case.
    #[serde(default)]
    pub state: String,

    /// `None` leaves membership to external management.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub who: Option<Vec<WhoItem>>,

    /// `None` leaves targets to external management.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub what: Option<Vec<WhatItem>>,
}

impl AccessProviderFields {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: String::new(),
            state: String::new(),
            who: None,
            what: None,
        }
    }
}

/// Capability shared by every declared access provider kind.
pub trait HasAccessProviderFields: Clone + Send + Sync + 'static {
    const KIND: AccessProviderKind;

    fn fields(&self) -> &AccessProviderFields;

    fn fields_mut(&mut self) -> &mut AccessProviderFields;

    fn what_cardinality() -> WhatCardinality {
        WhatCardinality::Many
    }

    /// Whether a target entry of this shape is allowed for the kind.
    fn accepts_what(item: &WhatItem) -> bool;

    /// Data source used for data objects that do not name their own.
    fn default_data_source(&self) -> Option<&DataSourceId> {
        None
    }

    /// Kind-specific checks beyond the shared ones.
    fn validate_kind(&self) -> ReconcileResult<()> {
        Ok(())
    }

    /// Copy kind-specific fields into a write payload.
    fn fill_input(&self, _input: &mut AccessProviderInput) {}

    /// Copy kind-specific fields back from the remote entity.
    fn absorb_remote(&mut self, _remote: &RemoteAccessProvider) {}
}

/// A grant: permissions on data objects or other access providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantState {
    #[serde(flatten)]
    pub fields: AccessProviderFields,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceId>,
}

impl GrantState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            fields: AccessProviderFields::new(name),
            data_source: None,
        }
    }
}

impl HasAccessProviderFields for GrantState {
    const KIND: AccessProviderKind = AccessProviderKind::Grant;

    fn fields(&self) -> &AccessProviderFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut AccessProviderFields {
        &mut self.fields
    }

    fn accepts_what(_item: &WhatItem) -> bool {
        true
    }

    fn default_data_source(&self) -> Option<&DataSourceId> {
        self.data_source.as_ref()
    }

    fn fill_input(&self, input: &mut AccessProviderInput) {
        input.data_source = self.data_source.clone();
    }

    fn absorb_remote(&mut self, remote: &RemoteAccessProvider) {
        self.data_source = remote.data_source.clone();
    }
}

/// A column mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskState {
    #[serde(flatten)]
    pub fields: AccessProviderFields,

    pub data_source: DataSourceId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_type: Option<String>,
}

impl MaskState {
    pub fn new(name: impl Into<String>, data_source: impl Into<DataSourceId>) -> Self {
        Self {
            fields: AccessProviderFields::new(name),
            data_source: data_source.into(),
            mask_type: None,
        }
    }
}

impl HasAccessProviderFields for MaskState {
    const KIND: AccessProviderKind = AccessProviderKind::Mask;

    fn fields(&self) -> &AccessProviderFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut AccessProviderFields {
        &mut self.fields
    }

    fn accepts_what(item: &WhatItem) -> bool {
        item.is_data_object()
    }

    fn default_data_source(&self) -> Option<&DataSourceId> {
        Some(&self.data_source)
    }

    fn fill_input(&self, input: &mut AccessProviderInput) {
        input.data_source = Some(self.data_source.clone());
        input.mask_type = self.mask_type.clone();
    }

    fn absorb_remote(&mut self, remote: &RemoteAccessProvider) {
        if let Some(data_source) = &remote.data_source {
            self.data_source = data_source.clone();
        }
        self.mask_type = remote.mask_type.clone();
    }
}

/// A row filter on a single table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterState {
    #[serde(flatten)]
    pub fields: AccessProviderFields,

    pub data_source: DataSourceId,

    /// Row filter expression in the data source's dialect.
    pub filter_policy: String,
}

impl FilterState {
    pub fn new(
        name: impl Into<String>,
        data_source: impl Into<DataSourceId>,
        filter_policy: impl Into<String>,
    ) -> Self {
        Self {
            fields: AccessProviderFields::new(name),
            data_source: data_source.into(),
            filter_policy: filter_policy.into(),
        }
    }
}

impl HasAccessProviderFields for FilterState {
    const KIND: AccessProviderKind = AccessProviderKind::Filter;

    fn fields(&self) -> &AccessProviderFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut AccessProviderFields {
        &mut self.fields
    }

    fn what_cardinality() -> WhatCardinality {
        WhatCardinality::Single
    }

    fn accepts_what(item: &WhatItem) -> bool {
        item.is_data_object()
    }

    fn default_data_source(&self) -> Option<&DataSourceId> {
        Some(&self.data_source)
    }

    fn validate_kind(&self) -> ReconcileResult<()> {
        if self.filter_policy.trim().is_empty() {
            return Err(ReconcileError::validation(
                "filterPolicy",
                "filter policy must not be empty",
            ));
        }
        Ok(())
    }

    fn fill_input(&self, input: &mut AccessProviderInput) {
        input.data_source = Some(self.data_source.clone());
        input.filter_policy = Some(self.filter_policy.clone());
    }

    fn absorb_remote(&mut self, remote: &RemoteAccessProvider) {
        if let Some(data_source) = &remote.data_source {
            self.data_source = data_source.clone();
        }
        if let Some(policy) = &remote.filter_policy {
            self.filter_policy = policy.clone();
        }
    }
}

/// A purpose grouping other access providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurposeState {
    #[serde(flatten)]
    pub fields: AccessProviderFields,
}

impl PurposeState {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            fields: AccessProviderFields::new(name),
        }
    }
}

impl HasAccessProviderFields for PurposeState {
    const KIND: AccessProviderKind = AccessProviderKind::Purpose;

    fn fields(&self) -> &AccessProviderFields {
        &self.fields
    }

    fn fields_mut(&mut self) -> &mut AccessProviderFields {
        &mut self.fields
    }

    fn accepts_what(item: &WhatItem) -> bool {
        !item.is_data_object()
    }
}
