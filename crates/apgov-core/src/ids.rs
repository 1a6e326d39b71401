//! Strongly Typed Identifiers
//!
//! Remote identifiers handed out by the access-governance service are opaque
//! strings. Wrapping each kind in its own newtype keeps a data source id from
//! being passed where an access provider id is expected.
//!
//! # Example
//!
//! ```
//! use apgov_core::{AccessProviderId, DataSourceId};
//!
//! let ap: AccessProviderId = "ap-42".parse().unwrap();
//! let ds = DataSourceId::new("ds-snowflake");
//!
//! fn requires_data_source(id: &DataSourceId) -> &str {
//!     id.as_str()
//! }
//!
//! assert_eq!(requires_data_source(&ds), "ds-snowflake");
//! assert_eq!(ap.to_string(), "ap-42");
//! // requires_data_source(&ap); // This would not compile!
//! ```

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Error type for ID parsing failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    /// The type of ID that failed to parse
    pub id_type: &'static str,
    /// Why the input was rejected
    pub message: String,
}

impl Display for ParseIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to parse {}: {}", self.id_type, self.message)
    }
}

impl std::error::Error for ParseIdError {}

/// Macro to define an opaque, string-backed identifier type
macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps a remote identifier without validation.
            #[must_use]
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consumes the identifier and returns the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    return Err(ParseIdError {
                        id_type: stringify!($name),
                        message: "identifier must not be empty".to_string(),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(
    /// Identifier of an access provider (grant, mask, filter or purpose).
    AccessProviderId
);

define_id!(
    /// Identifier of a data source registered with the governance service.
    DataSourceId
);

define_id!(
    /// Identifier of an identity store (a directory of users and groups).
    IdentityStoreId
);

define_id!(
    /// Identifier of a data object (schema, table, column, ...) inside a data source.
    ///
    /// Obtained by resolving a full name such as `DB.SCHEMA.TABLE.COLUMN`.
    DataObjectId
);
