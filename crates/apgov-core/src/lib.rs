//! apgov Core Library
//!
//! Shared identifiers and domain errors for the access-provider
//! reconciliation engine.
//!
//! # Modules
//!
//! - [`ids`] - Opaque remote identifiers (`AccessProviderId`, `DataSourceId`, ...)
//! - [`error`] - Domain error taxonomy (`ApgovError`)

pub mod error;
pub mod ids;

pub use error::{ApgovError, Result};
pub use ids::{AccessProviderId, DataObjectId, DataSourceId, IdentityStoreId, ParseIdError};
