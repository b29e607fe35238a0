use std::sync::Arc;

use anyhow::Result;
use waybill_types::{TrackingRecord, normalize_code};

use crate::{CloudProvider, secondary_container};

/// Storage primitive a backend provides: read or upsert one record in a
/// named container, keyed by an already-normalized code.
pub trait DocumentTransport: Send + Sync {
    /// `Ok(None)` when the container holds no entry for `code`.
    fn get(&self, container: &str, code: &str) -> Result<Option<TrackingRecord>>;

    /// Insert or overwrite the entry for `code`.
    fn upsert(&self, container: &str, code: &str, record: &TrackingRecord) -> Result<()>;
}

impl<T: DocumentTransport + ?Sized> DocumentTransport for Arc<T> {
    fn get(&self, container: &str, code: &str) -> Result<Option<TrackingRecord>> {
        (**self).get(container, code)
    }

    fn upsert(&self, container: &str, code: &str, record: &TrackingRecord) -> Result<()> {
        (**self).upsert(container, code, record)
    }
}

impl<T: DocumentTransport + ?Sized> DocumentTransport for Box<T> {
    fn get(&self, container: &str, code: &str) -> Result<Option<TrackingRecord>> {
        (**self).get(container, code)
    }

    fn upsert(&self, container: &str, code: &str, record: &TrackingRecord) -> Result<()> {
        (**self).upsert(container, code, record)
    }
}

/// Fetch/save policy over any [`DocumentTransport`].
///
/// Every operation tries the primary container first and the secondary
/// container at most once. Errors are converted into `None` / `false`.
#[derive(Debug, Clone)]
pub struct ProviderAdapter<T> {
    transport: T,
    primary: String,
    secondary: String,
}

impl<T: DocumentTransport> ProviderAdapter<T> {
    /// Wrap `transport`, deriving the secondary container from `primary`.
    pub fn new(transport: T, primary: impl Into<String>) -> Self {
        let primary = primary.into();
        let secondary = secondary_container(&primary).to_string();
        Self {
            transport,
            primary,
            secondary,
        }
    }

    /// Primary container name
    pub fn primary(&self) -> &str {
        &self.primary
    }

    /// Secondary container name
    pub fn secondary(&self) -> &str {
        &self.secondary
    }

    /// The wrapped transport
    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: DocumentTransport> CloudProvider for ProviderAdapter<T> {
    fn fetch_by_code(&self, code: &str) -> Option<TrackingRecord> {
        let code = normalize_code(code);

        if let Ok(Some(record)) = self.transport.get(&self.primary, &code) {
            return Some(record);
        }

        self.transport.get(&self.secondary, &code).ok().flatten()
    }

    fn save(&self, record: &TrackingRecord) -> bool {
        let code = record.normalized_code();
        // key and payload carry the same code
        let mut payload = record.clone();
        payload.code = code.clone();

        if self.transport.upsert(&self.primary, &code, &payload).is_ok() {
            return true;
        }

        self.transport.upsert(&self.secondary, &code, &payload).is_ok()
    }
}
