//! Declared-state and remote fixtures.

use apgov_connector::types::{
    AccessProviderKind, AccessProviderState, Beneficiary, DataObjectRef, RemoteAccessProvider,
    RemoteWhatItem, WhoEntry,
};
use apgov_core::{AccessProviderId, DataObjectId, DataSourceId};
use apgov_reconcile::{GrantState, WhatItem, WhoItem};

use super::TestContext;

/// Full names registered by [`register_sales_objects`].
pub const ORDERS: &str = "SALES.PUBLIC.ORDERS";
pub const CUSTOMERS: &str = "SALES.PUBLIC.CUSTOMERS";
pub const EMAIL: &str = "SALES.PUBLIC.CUSTOMERS.EMAIL";

pub async fn register_sales_objects(ctx: &TestContext) -> Vec<DataObjectId> {
    let mut ids = Vec::new();
    for name in [ORDERS, CUSTOMERS, EMAIL] {
        ids.push(ctx.service.register_data_object(&ctx.data_source, name).await);
    }
    ids
}

pub fn user(id: &str) -> Beneficiary {
    Beneficiary::User(id.to_string())
}

/// A grant on the orders table for `who`.
pub fn sales_grant(ctx: &TestContext, who: Vec<WhoItem>) -> GrantState {
    let mut grant = GrantState::new("Sales read");
    grant.fields.description = "Read access to sales orders".to_string();
    grant.data_source = Some(ctx.data_source.clone());
    grant.fields.who = Some(who);
    grant.fields.what = Some(vec![WhatItem::data_object(ORDERS)
        .with_permissions(["SELECT"])
        .into()]);
    grant
}

pub fn remote_access_provider(
    id: &str,
    kind: AccessProviderKind,
    data_source: Option<&DataSourceId>,
) -> RemoteAccessProvider {
    RemoteAccessProvider {
        id: AccessProviderId::new(id),
        kind,
        name: format!("{kind} {id}"),
        description: String::new(),
        state: AccessProviderState::Active,
        data_source: data_source.cloned(),
        mask_type: None,
        filter_policy: None,
    }
}

pub fn remote_object(id: &str, full_name: &str, data_source: &DataSourceId) -> RemoteWhatItem {
    RemoteWhatItem::DataObject {
        object: DataObjectRef {
            id: DataObjectId::new(id),
            full_name: full_name.to_string(),
            data_source: data_source.clone(),
        },
        permissions: Default::default(),
        global_permissions: Default::default(),
    }
}

/// A promise without its duration, as a misbehaving service might list it.
pub fn broken_promise(beneficiary: Beneficiary) -> WhoEntry {
    let mut entry = WhoEntry::promise(beneficiary, 1);
    entry.promise_duration = None;
    entry
}
