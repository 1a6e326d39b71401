//! What-item projection.
//!
//! Declared targets reference data objects by full name; the service wants
//! object ids. Reads go the other way, from listed objects back to names.

use apgov_connector::types::{RemoteWhatItem, WhatEntry};
use apgov_connector::{DataObjectResolver, Listing};
use apgov_core::DataSourceId;
use tracing::{debug, warn};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::{ReconcileError, ReconcileResult};
use crate::model::{WhatCardinality, WhatDataObject, WhatItem};

/// Resolved payload entries of one projection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectedWhat {
    pub entries: Vec<WhatEntry>,
    pub attempted: usize,
    pub failed: usize,
}

impl ProjectedWhat {
    pub fn fully_applied(&self) -> bool {
        self.failed == 0
    }
}

/// Translates declared targets into payload entries.
pub struct WhatProjector<'a, R: DataObjectResolver + ?Sized> {
    resolver: &'a R,
}

impl<'a, R: DataObjectResolver + ?Sized> WhatProjector<'a, R> {
    pub fn new(resolver: &'a R) -> Self {
        Self { resolver }
    }

    /// Resolve every declared item.
    ///
    /// An item that cannot be resolved is reported and skipped; the rest are
    /// still projected.
    pub async fn project(
        &self,
        items: &[WhatItem],
        default_data_source: Option<&DataSourceId>,
        diagnostics: &mut Diagnostics,
    ) -> ProjectedWhat {
        let mut projected = ProjectedWhat {
            attempted: items.len(),
            ..ProjectedWhat::default()
        };

        for item in items {
            match item {
                WhatItem::AccessProvider { id } => {
                    projected
                        .entries
                        .push(WhatEntry::AccessProvider { id: id.clone() });
                }
                WhatItem::DataObject(object) => {
                    match self.resolve(object, default_data_source).await {
                        Ok(entry) => projected.entries.push(entry),
                        Err(detail) => {
                            warn!(full_name = %object.full_name, %detail, "Could not resolve data object");
                            projected.failed += 1;
                            diagnostics.push(
                                Diagnostic::error(
                                    "PARTIAL_APPLY",
                                    format!("data object {} was not applied", object.full_name),
                                )
                                .with_detail(detail),
                            );
                        }
                    }
                }
            }
        }

        if !projected.fully_applied() {
            let summary = ReconcileError::PartialApply {
                failed: projected.failed,
                attempted: projected.attempted,
            };
            diagnostics.push(Diagnostic::warning(summary.error_code(), summary.to_string()));
        }
        projected
    }

    async fn resolve(
        &self,
        object: &WhatDataObject,
        default_data_source: Option<&DataSourceId>,
    ) -> Result<WhatEntry, String> {
        let data_source = object
            .data_source
            .as_ref()
            .or(default_data_source)
            .ok_or_else(|| "no data source to resolve it in".to_string())?;
        let id = self
            .resolver
            .resolve_object_id(&object.full_name, data_source)
            .await
            .map_err(|e| e.to_string())?;
        debug!(full_name = %object.full_name, object_id = %id, "Resolved data object");
        Ok(WhatEntry::DataObject {
            id,
            permissions: object.permissions.clone(),
            global_permissions: object.global_permissions.clone(),
        })
    }
}

/// Drain a what listing.
///
/// A single-target kind observing more than one target is a consistency
/// violation.
pub async fn observe_what(
    mut listing: Listing<RemoteWhatItem>,
    cardinality: WhatCardinality,
) -> ReconcileResult<Vec<RemoteWhatItem>> {
    let mut items = Vec::new();
    while let Some(item) = listing.next().await {
        items.push(item.map_err(|e| ReconcileError::sequence("whatItems", e))?);
    }
    if cardinality == WhatCardinality::Single && items.len() > 1 {
        return Err(ReconcileError::consistency(format!(
            "expected a single target, the service lists {}",
            items.len()
        )));
    }
    Ok(items)
}

/// Rebuild declared items from listed targets.
///
/// Objects in `default_data_source` come back without an explicit data source.
pub fn reconstruct_what(
    items: &[RemoteWhatItem],
    default_data_source: Option<&DataSourceId>,
) -> Vec<WhatItem> {
    items
        .iter()
        .map(|item| match item {
            RemoteWhatItem::DataObject {
                object,
                permissions,
                global_permissions,
            } => WhatItem::DataObject(WhatDataObject {
                full_name: object.full_name.clone(),
                permissions: permissions.clone(),
                global_permissions: global_permissions.clone(),
                data_source: (Some(&object.data_source) != default_data_source)
                    .then(|| object.data_source.clone()),
            }),
            RemoteWhatItem::AccessProvider { id } => WhatItem::AccessProvider { id: id.clone() },
        })
        .collect()
}
