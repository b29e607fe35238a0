//! Cloud storage for waybill tracking records.
//!
//! Two interchangeable backends persist records remotely:
//!
//! - [`RestTableClient`]: a PostgREST-style row store (provider A)
//! - [`FirestoreClient`]: a document store REST API (provider B)
//!
//! Both implement only the [`DocumentTransport`] seam. The fetch/save policy,
//! including the single primary → secondary container fallback, lives once in
//! [`ProviderAdapter`]. [`CloudGateway`] selects at most one provider at
//! startup and turns every call into a no-op when none is configured.
//!
//! Failures never escape as errors: fetches yield `None`, saves yield `false`.
//!
//! # Example
//!
//! ```
//! use waybill_cloud::{CloudConfig, CloudGateway};
//! use waybill_types::TrackingRecord;
//!
//! let gateway = CloudGateway::from_config(&CloudConfig::default());
//! assert!(!gateway.is_enabled());
//!
//! let record = TrackingRecord::new("AB12", "A", "B");
//! assert!(!gateway.save(&record));
//! assert!(gateway.fetch_by_code("ab12").is_none());
//! ```

use serde::{Deserialize, Serialize};
use waybill_types::TrackingRecord;

mod adapter;
mod firestore;
mod gateway;
mod rest;

pub use adapter::{DocumentTransport, ProviderAdapter};
pub use firestore::{FIRESTORE_ENDPOINT, FirestoreClient, from_firestore_value, to_firestore_value};
pub use gateway::CloudGateway;
pub use rest::RestTableClient;

/// Default primary container (table or collection) name
pub const DEFAULT_CONTAINER: &str = "tracking";

/// Legacy alias probed when the default container fails
pub const LEGACY_CONTAINER: &str = "tracking_data";

/// Default timeout for provider requests
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for provider requests
pub const USER_AGENT: &str = concat!("waybill/", env!("CARGO_PKG_VERSION"));

/// The fallback container for `primary`.
///
/// `"tracking"` maps to `"tracking_data"`; every other name maps back to
/// `"tracking"`.
pub fn secondary_container(primary: &str) -> &'static str {
    if primary == DEFAULT_CONTAINER {
        LEGACY_CONTAINER
    } else {
        DEFAULT_CONTAINER
    }
}

/// Fetch/save capability shared by every cloud backend.
pub trait CloudProvider: Send + Sync {
    /// Look up a record by code. The code is normalized before lookup.
    fn fetch_by_code(&self, code: &str) -> Option<TrackingRecord>;

    /// Upsert a record keyed by its normalized code.
    fn save(&self, record: &TrackingRecord) -> bool;
}

/// Which backend a gateway selected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// PostgREST-style row store
    Rest,
    /// Firestore document store
    Firestore,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Rest => write!(f, "rest"),
            ProviderKind::Firestore => write!(f, "firestore"),
        }
    }
}

/// Connection settings for the row store (provider A)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConfig {
    /// Project URL, e.g. `https://project.supabase.co`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Anonymous API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub anon_key: Option<String>,
    /// Primary table name (default: `tracking`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
}

impl RestConfig {
    /// Create a config from a project URL and key
    pub fn new(url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            anon_key: Some(anon_key.into()),
            table: None,
        }
    }

    /// Set the primary table
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Both URL and key are present and non-empty.
    pub fn is_complete(&self) -> bool {
        is_set(&self.url) && is_set(&self.anon_key)
    }

    /// The primary table name
    pub fn table(&self) -> &str {
        non_empty(&self.table).unwrap_or(DEFAULT_CONTAINER)
    }
}

/// Connection settings for the document store (provider B)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirestoreConfig {
    /// Web API key
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Project identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    /// Primary collection name (default: `tracking`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    /// API endpoint override (emulators, tests)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

impl FirestoreConfig {
    /// Create a config from an API key and project id
    pub fn new(api_key: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            project_id: Some(project_id.into()),
            collection: None,
            endpoint: None,
        }
    }

    /// Set the primary collection
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = Some(collection.into());
        self
    }

    /// Set the API endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Both API key and project id are present and non-empty.
    pub fn is_complete(&self) -> bool {
        is_set(&self.api_key) && is_set(&self.project_id)
    }

    /// The primary collection name
    pub fn collection(&self) -> &str {
        non_empty(&self.collection).unwrap_or(DEFAULT_CONTAINER)
    }

    /// The API endpoint
    pub fn endpoint(&self) -> &str {
        non_empty(&self.endpoint).unwrap_or(FIRESTORE_ENDPOINT)
    }
}

/// Credentials for both providers plus shared HTTP settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloudConfig {
    #[serde(default)]
    pub rest: RestConfig,
    #[serde(default)]
    pub firestore: FirestoreConfig,
    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl Default for CloudConfig {
    fn default() -> Self {
        Self {
            rest: RestConfig::default(),
            firestore: FirestoreConfig::default(),
            timeout_secs: default_timeout(),
        }
    }
}

impl CloudConfig {
    /// Configure the row store
    pub fn with_rest(mut self, rest: RestConfig) -> Self {
        self.rest = rest;
        self
    }

    /// Configure the document store
    pub fn with_firestore(mut self, firestore: FirestoreConfig) -> Self {
        self.firestore = firestore;
        self
    }

    /// The provider this configuration selects. The row store wins when both
    /// are complete.
    pub fn selected_provider(&self) -> Option<ProviderKind> {
        if self.rest.is_complete() {
            Some(ProviderKind::Rest)
        } else if self.firestore.is_complete() {
            Some(ProviderKind::Firestore)
        } else {
            None
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn is_set(value: &Option<String>) -> bool {
    non_empty(value).is_some()
}
