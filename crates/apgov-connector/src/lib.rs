//! # Governance Connector
//!
//! The boundary between the reconciliation engine and the remote
//! access-governance service.
//!
//! ## Architecture
//!
//! The engine consumes capability traits; a transport implements the ones
//! it supports:
//!
//! - [`AccessProviderClient`] - CRUD, activate/deactivate, who/what listings
//! - [`DataObjectResolver`] - Resolve data object full names to ids
//! - [`IdentityStoreClient`] - Data source to identity store links
//! - [`RoleClient`] - Global role assignments
//!
//! Remote list endpoints are exposed as [`Listing`]s: pull-based,
//! cancellable, deadline-bound sequences of `ConnectorResult<T>`.
//!
//! ## Example
//!
//! ```ignore
//! use apgov_connector::prelude::*;
//!
//! let service = InMemoryGovernanceService::new();
//! let created = service
//!     .create_access_provider(AccessProviderInput::new(AccessProviderKind::Grant, "Sales read"))
//!     .await?;
//!
//! // Pages are fetched as the listing is drained.
//! let members = service.list_who_items(&created.id).collect_all().await?;
//! assert!(members.is_empty());
//! ```
//!
//! ## Crate Organization
//!
//! - [`types`] - Remote entity shapes and enums
//! - [`error`] - Error types with transient/permanent classification
//! - [`traits`] - Collaborator capability traits
//! - [`listing`] - Cancellable lazy listings
//! - [`config`] - Client settings
//! - [`memory`] - In-memory governance service

pub mod config;
pub mod error;
pub mod listing;
pub mod memory;
pub mod traits;
pub mod types;

pub use config::ClientSettings;
pub use error::{ConnectorError, ConnectorResult};
pub use listing::{Listing, Page, PageRequest};
pub use memory::{FailPoint, InMemoryGovernanceService, Mutation};
pub use traits::{AccessProviderClient, DataObjectResolver, IdentityStoreClient, RoleClient};

/// Prelude module for convenient imports.
///
/// ```
/// use apgov_connector::prelude::*;
/// ```
pub mod prelude {
    pub use crate::config::ClientSettings;
    pub use crate::error::{ConnectorError, ConnectorResult};
    pub use crate::listing::{Listing, Page, PageRequest};
    pub use crate::memory::{FailPoint, InMemoryGovernanceService, Mutation};
    pub use crate::traits::{
        AccessProviderClient, DataObjectResolver, IdentityStoreClient, RoleClient,
    };
    pub use crate::types::{
        AccessProviderInput, AccessProviderKind, AccessProviderState, Beneficiary,
        DataObjectRef, IdentityStoreLink, RemoteAccessProvider, RemoteWhatItem, RoleAssignment,
        RoleAssignmentFilter, WhatEntry, WhoEntry, WhoItemKind,
    };
}

// Re-export async_trait for transport implementors
pub use async_trait::async_trait;

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_prelude_imports() {
        let _kind = AccessProviderKind::Mask;
        let _state = AccessProviderState::Inactive;
        let _entry = WhoEntry::grant(Beneficiary::Group("analysts".to_string()));
        let _filter = RoleAssignmentFilter::exact("Admin", "u1");
        let _settings = ClientSettings::default();
    }
}
