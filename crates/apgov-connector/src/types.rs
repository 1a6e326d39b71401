//! Remote entity types
//!
//! Shapes exchanged with the governance service: access providers, their who
//! and what entries, identity-store links and role assignments.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use apgov_core::{AccessProviderId, DataObjectId, DataSourceId, IdentityStoreId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of access provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessProviderKind {
    /// Grants permissions on data objects.
    Grant,
    /// Masks column values.
    Mask,
    /// Filters rows of a single table.
    Filter,
    /// Groups other access providers under a business purpose.
    Purpose,
}

impl AccessProviderKind {
    /// Get all kinds.
    #[must_use]
    pub fn all() -> &'static [AccessProviderKind] {
        &[
            AccessProviderKind::Grant,
            AccessProviderKind::Mask,
            AccessProviderKind::Filter,
            AccessProviderKind::Purpose,
        ]
    }

    /// Get the string representation used by the service.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessProviderKind::Grant => "grant",
            AccessProviderKind::Mask => "mask",
            AccessProviderKind::Filter => "filter",
            AccessProviderKind::Purpose => "purpose",
        }
    }
}

impl fmt::Display for AccessProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle state of an access provider as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AccessProviderState {
    /// Enforced on the data sources.
    #[default]
    Active,
    /// Defined but not enforced.
    Inactive,
    /// Soft-deleted; only visible until the service purges it.
    Deleted,
}

impl AccessProviderState {
    /// Get the string representation used by the service.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessProviderState::Active => "Active",
            AccessProviderState::Inactive => "Inactive",
            AccessProviderState::Deleted => "Deleted",
        }
    }

    /// Check if this state can be requested through an activate/deactivate call.
    #[must_use]
    pub fn is_settable(&self) -> bool {
        !matches!(self, AccessProviderState::Deleted)
    }
}

impl fmt::Display for AccessProviderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AccessProviderState {
    type Err = ParseAccessProviderStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(AccessProviderState::Active),
            "inactive" => Ok(AccessProviderState::Inactive),
            "deleted" => Ok(AccessProviderState::Deleted),
            _ => Err(ParseAccessProviderStateError(s.to_string())),
        }
    }
}

/// Error parsing an access provider state from string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAccessProviderStateError(String);

impl fmt::Display for ParseAccessProviderStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid access provider state '{}', expected one of: Active, Inactive, Deleted",
            self.0
        )
    }
}

impl std::error::Error for ParseAccessProviderStateError {}

/// Whether a who entry is a realized grant or a promise awaiting promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum WhoItemKind {
    #[default]
    Grant,
    Promise,
}

impl WhoItemKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            WhoItemKind::Grant => "Grant",
            WhoItemKind::Promise => "Promise",
        }
    }
}

impl fmt::Display for WhoItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The party a who entry grants access to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "id")]
pub enum Beneficiary {
    /// A user, identified by email or account name.
    User(String),
    /// A group, identified by its name in the identity store.
    Group(String),
    /// Every member of another access provider.
    AccessProvider(AccessProviderId),
}

impl Beneficiary {
    /// Type tag used in promise keys and by the service.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Beneficiary::User(_) => "user",
            Beneficiary::Group(_) => "group",
            Beneficiary::AccessProvider(_) => "accessProvider",
        }
    }

    /// The beneficiary identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        match self {
            Beneficiary::User(id) | Beneficiary::Group(id) => id,
            Beneficiary::AccessProvider(id) => id.as_str(),
        }
    }
}

impl fmt::Display for Beneficiary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_name(), self.id())
    }
}

/// A membership entry, as listed by the service or sent in a write payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoEntry {
    pub beneficiary: Beneficiary,
    #[serde(rename = "type")]
    pub kind: WhoItemKind,
    /// Promise duration in seconds. Only meaningful for promises.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub promise_duration: Option<i64>,
    /// Grant expiry relative to its creation, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_after: Option<i64>,
    /// Absolute grant expiry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}

impl WhoEntry {
    /// A non-expiring grant.
    #[must_use]
    pub fn grant(beneficiary: Beneficiary) -> Self {
        Self {
            beneficiary,
            kind: WhoItemKind::Grant,
            promise_duration: None,
            expires_after: None,
            expires_at: None,
        }
    }

    /// A promise lasting `duration_secs` once promoted.
    #[must_use]
    pub fn promise(beneficiary: Beneficiary, duration_secs: i64) -> Self {
        Self {
            beneficiary,
            kind: WhoItemKind::Promise,
            promise_duration: Some(duration_secs),
            expires_after: None,
            expires_at: None,
        }
    }

    #[must_use]
    pub fn is_promise(&self) -> bool {
        self.kind == WhoItemKind::Promise
    }
}

/// A data object as the service describes it in listings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataObjectRef {
    pub id: DataObjectId,
    /// Dotted full name, e.g. `SALES.PUBLIC.ORDERS.EMAIL`.
    pub full_name: String,
    pub data_source: DataSourceId,
}

/// A target entry as listed by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum RemoteWhatItem {
    DataObject {
        object: DataObjectRef,
        #[serde(default)]
        permissions: BTreeSet<String>,
        #[serde(default)]
        global_permissions: BTreeSet<String>,
    },
    AccessProvider {
        id: AccessProviderId,
    },
}

/// A target entry in a write payload. Data objects are referenced by id only.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum WhatEntry {
    DataObject {
        id: DataObjectId,
        #[serde(default)]
        permissions: BTreeSet<String>,
        #[serde(default)]
        global_permissions: BTreeSet<String>,
    },
    AccessProvider {
        id: AccessProviderId,
    },
}

impl From<&RemoteWhatItem> for WhatEntry {
    fn from(item: &RemoteWhatItem) -> Self {
        match item {
            RemoteWhatItem::DataObject {
                object,
                permissions,
                global_permissions,
            } => WhatEntry::DataObject {
                id: object.id.clone(),
                permissions: permissions.clone(),
                global_permissions: global_permissions.clone(),
            },
            RemoteWhatItem::AccessProvider { id } => WhatEntry::AccessProvider { id: id.clone() },
        }
    }
}

/// Payload for create and update calls.
///
/// `who`/`what` set to `None` leave the remote sets untouched; `Some` replaces
/// them entirely, so anything missing from the list is revoked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessProviderInput {
    pub kind: AccessProviderKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub who: Option<Vec<WhoEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub what: Option<Vec<WhatEntry>>,
}

impl AccessProviderInput {
    /// Start a payload with no who/what sets.
    #[must_use]
    pub fn new(kind: AccessProviderKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            description: String::new(),
            data_source: None,
            mask_type: None,
            filter_policy: None,
            who: None,
            what: None,
        }
    }
}

/// An access provider as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteAccessProvider {
    pub id: AccessProviderId,
    pub kind: AccessProviderKind,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub state: AccessProviderState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSourceId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mask_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_policy: Option<String>,
}

/// A link between a data source and an identity store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityStoreLink {
    pub identity_store_id: IdentityStoreId,
    /// The data source's own identity store. Managed by the service.
    #[serde(default)]
    pub native: bool,
}

/// Assignment of a global role to a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleAssignment {
    pub role: String,
    pub user: String,
}

/// Filter for role assignment listings. Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleAssignmentFilter {
    pub role: Option<String>,
    pub user: Option<String>,
}

impl RoleAssignmentFilter {
    /// Filter on an exact role and user pair.
    #[must_use]
    pub fn exact(role: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            role: Some(role.into()),
            user: Some(user.into()),
        }
    }

    /// Check whether an assignment satisfies this filter.
    #[must_use]
    pub fn matches(&self, assignment: &RoleAssignment) -> bool {
        self.role.as_ref().is_none_or(|r| r == &assignment.role)
            && self.user.as_ref().is_none_or(|u| u == &assignment.user)
    }
}
