//! Checks run on declared state before any remote call.
//!
//! Field-level rules come from the `validator` derives on the model;
//! cross-field rules live here.

use apgov_connector::types::{AccessProviderState, WhoEntry, WhoItemKind};
use validator::{Validate, ValidationErrors};

use crate::error::{ReconcileError, ReconcileResult};
use crate::model::{HasAccessProviderFields, WhatCardinality, WhatItem, WhoItem};

fn field_errors(field: &str, errors: ValidationErrors) -> ReconcileError {
    ReconcileError::validation(field, errors.to_string())
}

/// Parse a declared state string. An empty string falls back to `default`.
pub fn parse_declared_state(
    raw: &str,
    default: AccessProviderState,
) -> ReconcileResult<AccessProviderState> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(default);
    }
    match raw.parse::<AccessProviderState>() {
        Ok(state) if state.is_settable() => Ok(state),
        _ => Err(ReconcileError::validation(
            "state",
            format!("'{raw}' is not a valid state, expected Active or Inactive"),
        )),
    }
}

/// Validate a declared who item and convert it into a payload entry.
pub fn validate_who_item(item: &WhoItem) -> ReconcileResult<WhoEntry> {
    item.validate().map_err(|e| field_errors("who", e))?;
    let beneficiary = item.beneficiary()?;

    match item.kind {
        WhoItemKind::Promise => {
            let Some(duration) = item.promise_duration else {
                return Err(ReconcileError::validation(
                    "who.promiseDuration",
                    format!("promise for {beneficiary} requires a promise duration"),
                ));
            };
            if item.expires_after.is_some() || item.expires_at.is_some() {
                return Err(ReconcileError::validation(
                    "who.expiresAfter",
                    format!("promise for {beneficiary} cannot carry an expiry"),
                ));
            }
            Ok(WhoEntry::promise(beneficiary, duration))
        }
        WhoItemKind::Grant => {
            if item.promise_duration.is_some() {
                return Err(ReconcileError::validation(
                    "who.promiseDuration",
                    format!("grant for {beneficiary} cannot carry a promise duration"),
                ));
            }
            let mut entry = WhoEntry::grant(beneficiary);
            entry.expires_after = item.expires_after;
            entry.expires_at = item.expires_at;
            Ok(entry)
        }
    }
}

fn validate_what<S: HasAccessProviderFields>(state: &S, items: &[WhatItem]) -> ReconcileResult<()> {
    if S::what_cardinality() == WhatCardinality::Single && items.len() != 1 {
        return Err(ReconcileError::validation(
            "what",
            format!(
                "a {} must target exactly one data object, got {}",
                S::KIND,
                items.len()
            ),
        ));
    }

    for item in items {
        if !S::accepts_what(item) {
            return Err(ReconcileError::validation(
                "what",
                format!("a {} cannot target {item:?}", S::KIND),
            ));
        }
        if let WhatItem::DataObject(object) = item {
            if object.full_name.trim().is_empty() {
                return Err(ReconcileError::validation(
                    "what.fullName",
                    "data object full name must not be empty",
                ));
            }
            if object.data_source.is_none() && state.default_data_source().is_none() {
                return Err(ReconcileError::validation(
                    "what.dataSource",
                    format!(
                        "data object {} needs a data source, on the item or the {}",
                        object.full_name,
                        S::KIND
                    ),
                ));
            }
        }
    }
    Ok(())
}

/// Validate a declared access provider and return its declared state.
pub fn validate_access_provider<S: HasAccessProviderFields>(
    state: &S,
    default_state: AccessProviderState,
) -> ReconcileResult<AccessProviderState> {
    let fields = state.fields();
    fields.validate().map_err(|e| field_errors("accessProvider", e))?;
    let declared = parse_declared_state(&fields.state, default_state)?;
    state.validate_kind()?;

    if let Some(who) = &fields.who {
        for item in who {
            validate_who_item(item)?;
        }
    }
    if let Some(what) = &fields.what {
        validate_what(state, what)?;
    }
    Ok(declared)
}
