//! Post-read extensions.
//!
//! Some kinds carry data that the shared read path does not rebuild. An
//! extension runs after the read and fills it in. Extensions run in
//! registration order; each one works on a copy, which is kept only if the
//! extension succeeds.

use std::sync::Arc;

use apgov_connector::types::RemoteAccessProvider;
use async_trait::async_trait;
use tracing::warn;

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::ReconcileResult;
use crate::model::HasAccessProviderFields;

/// A hook run on the rebuilt state after every read.
#[async_trait]
pub trait ReadExtension<S: HasAccessProviderFields>: Send + Sync {
    /// Name used in diagnostics.
    fn name(&self) -> &str;

    async fn extend(&self, remote: &RemoteAccessProvider, state: &mut S) -> ReconcileResult<()>;
}

/// Ordered list of read extensions for one kind.
pub struct ReadExtensions<S: HasAccessProviderFields> {
    extensions: Vec<Arc<dyn ReadExtension<S>>>,
}

impl<S: HasAccessProviderFields> Default for ReadExtensions<S> {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
        }
    }
}

impl<S: HasAccessProviderFields> Clone for ReadExtensions<S> {
    fn clone(&self) -> Self {
        Self {
            extensions: self.extensions.clone(),
        }
    }
}

impl<S: HasAccessProviderFields> ReadExtensions<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, extension: Arc<dyn ReadExtension<S>>) {
        self.extensions.push(extension);
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    /// Run every extension in order.
    pub async fn run(
        &self,
        remote: &RemoteAccessProvider,
        state: S,
        diagnostics: &mut Diagnostics,
    ) -> S {
        let mut current = state;
        for extension in &self.extensions {
            let mut candidate = current.clone();
            match extension.extend(remote, &mut candidate).await {
                Ok(()) => current = candidate,
                Err(e) => {
                    warn!(extension = extension.name(), error = %e, "Read extension failed");
                    diagnostics.push(
                        Diagnostic::error(
                            e.error_code(),
                            format!("read extension {} failed", extension.name()),
                        )
                        .with_detail(e.to_string()),
                    );
                }
            }
        }
        current
    }
}

impl<S: HasAccessProviderFields> std::fmt::Debug for ReadExtensions<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.extensions.iter().map(|e| e.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use apgov_connector::types::{AccessProviderKind, AccessProviderState};
    use apgov_core::AccessProviderId;

    use super::*;
    use crate::error::ReconcileError;
    use crate::model::PurposeState;

    struct Suffix(&'static str);

    #[async_trait]
    impl ReadExtension<PurposeState> for Suffix {
        fn name(&self) -> &str {
            self.0
        }

        async fn extend(
            &self,
            _remote: &RemoteAccessProvider,
            state: &mut PurposeState,
        ) -> ReconcileResult<()> {
            state.fields.description.push_str(self.0);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl ReadExtension<PurposeState> for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn extend(
            &self,
            _remote: &RemoteAccessProvider,
            state: &mut PurposeState,
        ) -> ReconcileResult<()> {
            state.fields.description = "clobbered".to_string();
            Err(ReconcileError::consistency("unexpected owner"))
        }
    }

    fn remote() -> RemoteAccessProvider {
        RemoteAccessProvider {
            id: AccessProviderId::new("ap-1"),
            kind: AccessProviderKind::Purpose,
            name: "Marketing".to_string(),
            description: String::new(),
            state: AccessProviderState::Active,
            data_source: None,
            mask_type: None,
            filter_policy: None,
        }
    }

    #[tokio::test]
    async fn test_run_in_registration_order() {
        let mut extensions = ReadExtensions::new();
        extensions.register(Arc::new(Suffix("a")));
        extensions.register(Arc::new(Suffix("b")));

        let mut diags = Diagnostics::new();
        let state = extensions
            .run(&remote(), PurposeState::new("Marketing"), &mut diags)
            .await;
        assert_eq!(state.fields.description, "ab");
        assert!(diags.is_empty());
    }

    #[tokio::test]
    async fn test_failed_extension_changes_are_discarded() {
        let mut extensions = ReadExtensions::new();
        extensions.register(Arc::new(Suffix("a")));
        extensions.register(Arc::new(Broken));
        extensions.register(Arc::new(Suffix("c")));

        let mut diags = Diagnostics::new();
        let state = extensions
            .run(&remote(), PurposeState::new("Marketing"), &mut diags)
            .await;
        assert_eq!(state.fields.description, "ac");
        assert!(diags.has_errors());
        assert!(diags.contains_code("CONSISTENCY_VIOLATION"));
        assert_eq!(format!("{extensions:?}"), r#"["a", "broken", "c"]"#);
    }
}
