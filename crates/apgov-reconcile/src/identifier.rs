//! Composite identifiers for associations without a remote id.
//!
//! Role assignments are identified by `<role>#<user>`. Decoding splits on the
//! first separator only, so everything after it belongs to the user part.
//! The codec does not judge the parts; empty ones round-trip unchanged.

use crate::error::{ReconcileError, ReconcileResult};

/// Separator between the parts of a composite identifier.
pub const SEPARATOR: char = '#';

/// Encode a role assignment identifier.
pub fn encode(role: &str, user: &str) -> String {
    format!("{role}{SEPARATOR}{user}")
}

/// Decode a role assignment identifier into `(role, user)`.
pub fn decode(id: &str) -> ReconcileResult<(String, String)> {
    let (role, user) = id.split_once(SEPARATOR).ok_or_else(|| {
        ReconcileError::validation(
            "id",
            format!("'{id}' is not of the form <role>{SEPARATOR}<user>"),
        )
    })?;
    Ok((role.to_string(), user.to_string()))
}
