use std::time::Duration;

use waybill_types::TrackingRecord;

use crate::{
    CloudConfig, CloudProvider, FirestoreClient, ProviderAdapter, ProviderKind, RestTableClient,
};

/// Single entry point for cloud reads and writes.
///
/// The provider is chosen once, when the gateway is built. Without one every
/// call returns immediately: `fetch_by_code` yields `None` and `save` yields
/// `false`, and no request is made.
pub struct CloudGateway {
    selected: Option<(ProviderKind, Box<dyn CloudProvider>)>,
}

impl CloudGateway {
    /// A gateway with no provider.
    pub fn disabled() -> Self {
        Self { selected: None }
    }

    /// Select and build the provider named by `config`.
    pub fn from_config(config: &CloudConfig) -> Self {
        let timeout = Duration::from_secs(config.timeout_secs);
        Self::from_config_with(config, |kind| -> Box<dyn CloudProvider> {
            match kind {
                ProviderKind::Rest => Box::new(ProviderAdapter::new(
                    RestTableClient::from_config(&config.rest, timeout),
                    config.rest.table(),
                )),
                ProviderKind::Firestore => Box::new(ProviderAdapter::new(
                    FirestoreClient::from_config(&config.firestore, timeout),
                    config.firestore.collection(),
                )),
            }
        })
    }

    /// Select a provider from `config` and let `build` construct it. `build`
    /// runs at most once, and only for the selected kind.
    pub fn from_config_with<F>(config: &CloudConfig, build: F) -> Self
    where
        F: FnOnce(ProviderKind) -> Box<dyn CloudProvider>,
    {
        match config.selected_provider() {
            Some(kind) => Self::with_provider(kind, build(kind)),
            None => Self::disabled(),
        }
    }

    /// A gateway around an already-built provider.
    pub fn with_provider(kind: ProviderKind, provider: Box<dyn CloudProvider>) -> Self {
        Self {
            selected: Some((kind, provider)),
        }
    }

    /// Whether a provider was selected
    pub fn is_enabled(&self) -> bool {
        self.selected.is_some()
    }

    /// The selected provider kind
    pub fn provider_kind(&self) -> Option<ProviderKind> {
        self.selected.as_ref().map(|(kind, _)| *kind)
    }

    /// Fetch a record by code through the selected provider.
    pub fn fetch_by_code(&self, code: &str) -> Option<TrackingRecord> {
        let (_, provider) = self.selected.as_ref()?;
        provider.fetch_by_code(code)
    }

    /// Save a record through the selected provider.
    pub fn save(&self, record: &TrackingRecord) -> bool {
        match &self.selected {
            Some((_, provider)) => provider.save(record),
            None => false,
        }
    }
}

impl Default for CloudGateway {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for CloudGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudGateway")
            .field("provider", &self.provider_kind())
            .finish()
    }
}
