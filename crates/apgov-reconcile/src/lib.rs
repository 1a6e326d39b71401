//! Access-provider reconciliation engine.
//!
//! Brings a remote access-governance service in line with declared access
//! providers (grants, masks, filters and purposes), their membership ("who")
//! and targets ("what"), data source identity-store links and global role
//! assignments.
//!
//! # Flow
//!
//! The [`orchestrator::AccessProviderOrchestrator`] validates a declaration,
//! lets the [`lifecycle`] issue the primary mutation and any state change,
//! computes who and what payloads with [`who::WhoReconciler`] and
//! [`what::WhatProjector`], then re-reads the remote and rebuilds the
//! declared state.
//!
//! # Modules
//!
//! - [`set_diff`] - Declared versus observed set difference
//! - [`identifier`] - `<role>#<user>` composite identifiers
//! - [`model`] - Declared state per kind
//! - [`validation`] - Checks run before any remote call
//! - [`who`] - Promise and grant merging
//! - [`what`] - Target resolution and reconstruction
//! - [`lifecycle`] - Create/update and state change sequencing
//! - [`extensions`] - Post-read hooks
//! - [`orchestrator`] - Create, read, update, delete
//! - [`identity_links`] - Data source identity-store links
//! - [`role_assignment`] - Global role assignments
//! - [`diagnostics`] - Accumulated error and warning reports
//! - [`config`] - Engine configuration

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod extensions;
pub mod identifier;
pub mod identity_links;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod role_assignment;
pub mod set_diff;
pub mod validation;
pub mod what;
pub mod who;

pub use config::{NativeLinkPolicy, ReconcileConfig, CONFIG_ENV_VAR};
pub use diagnostics::{Diagnostic, Diagnostics, Severity};
pub use error::{ReconcileError, ReconcileResult};
pub use extensions::{ReadExtension, ReadExtensions};
pub use identity_links::IdentityLinkReconciler;
pub use lifecycle::{Lifecycle, LifecycleState};
pub use model::{
    AccessProviderFields, FilterState, GrantState, HasAccessProviderFields, MaskState,
    PurposeState, WhatCardinality, WhatDataObject, WhatItem, WhoItem,
};
pub use orchestrator::{AccessProviderOrchestrator, Applied};
pub use role_assignment::{RoleAssignmentReconciler, RoleAssignmentState};
pub use set_diff::{diff, SetDiff};
pub use who::{PromiseKey, WhoObservation, WhoReconciler};
