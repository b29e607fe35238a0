use std::fmt;

use anyhow::{Context, Result, bail};
use waybill_cloud::CloudGateway;
use waybill_config::{Config, ShareSettings, load_settings};
use waybill_share::{build_share_link, parse_share_link, resolve_base_url};
use waybill_storage::{FileRecordStore, RecordStore};
use waybill_types::{NewStep, TrackingRecord, normalize_code};

pub trait Reporter {
    fn info(&mut self, msg: &str);
    fn warn(&mut self, msg: &str);
    fn error(&mut self, msg: &str);
}

/// What happened to the cloud copy after a local write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The selected provider accepted the record
    Saved,
    /// No provider is configured
    Skipped,
    /// Both containers rejected the record; the local copy stands
    Failed,
}

impl SyncOutcome {
    pub fn is_saved(self) -> bool {
        self == SyncOutcome::Saved
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Saved => write!(f, "saved"),
            SyncOutcome::Skipped => write!(f, "skipped"),
            SyncOutcome::Failed => write!(f, "failed"),
        }
    }
}

/// Local store plus optional cloud mirror.
///
/// Every mutation writes the local store first. Local failures are errors;
/// cloud failures only change the returned [`SyncOutcome`].
pub struct Tracker<S: RecordStore> {
    store: S,
    gateway: CloudGateway,
    settings: ShareSettings,
    default_base_url: Option<String>,
}

impl Tracker<FileRecordStore> {
    /// Build the file-backed tracker described by `config`, including the
    /// persisted share settings in its store directory.
    pub fn open(config: &Config) -> Result<Self> {
        let store_dir = config.store_dir();
        let settings = load_settings(&store_dir)?;

        Ok(Tracker::new(
            FileRecordStore::new(store_dir),
            CloudGateway::from_config(&config.cloud()),
        )
        .with_settings(settings)
        .with_default_base_url(config.public_base_url()))
    }
}

impl<S: RecordStore> Tracker<S> {
    pub fn new(store: S, gateway: CloudGateway) -> Self {
        Self {
            store,
            gateway,
            settings: ShareSettings::default(),
            default_base_url: None,
        }
    }

    /// Use `settings` for the share base-URL override
    pub fn with_settings(mut self, settings: ShareSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Configured base URL used when no override is set
    pub fn with_default_base_url(mut self, url: Option<&str>) -> Self {
        self.default_base_url = url.map(str::to_string);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn gateway(&self) -> &CloudGateway {
        &self.gateway
    }

    pub fn settings(&self) -> &ShareSettings {
        &self.settings
    }

    /// Base URL for share links: override, then configured default.
    pub fn base_url(&self) -> Option<&str> {
        resolve_base_url(
            self.settings.public_base_url(),
            self.default_base_url.as_deref(),
        )
    }

    pub fn list(&self) -> Result<Vec<TrackingRecord>> {
        self.store.get_all()
    }

    pub fn get(&self, code: &str) -> Result<Option<TrackingRecord>> {
        self.store.get(code)
    }

    fn require(&self, code: &str) -> Result<TrackingRecord> {
        self.store
            .get(code)?
            .with_context(|| format!("no local record for code {}", normalize_code(code)))
    }

    /// Write `record` locally, then mirror it to the cloud.
    pub fn upsert(&self, record: &TrackingRecord, reporter: &mut dyn Reporter) -> Result<SyncOutcome> {
        let mut record = record.clone();
        record.normalize();
        self.store.put(&record)?;
        Ok(self.sync(&record, reporter))
    }

    /// Create a record or edit its details. An existing record keeps its steps.
    pub fn save_details(
        &self,
        details: TrackingRecord,
        reporter: &mut dyn Reporter,
    ) -> Result<(TrackingRecord, SyncOutcome)> {
        let mut record = details;
        record.normalize();
        if record.code.is_empty() {
            bail!("tracking code must not be empty");
        }
        if record.origin.trim().is_empty() || record.destination.trim().is_empty() {
            bail!("{}: origin and destination are required", record.code);
        }

        if let Some(existing) = self.store.get(&record.code)? {
            record.steps = existing.steps;
        }

        let outcome = self.upsert(&record, reporter)?;
        Ok((record, outcome))
    }

    /// Append a step to a stored record and make it current.
    pub fn add_step(
        &self,
        code: &str,
        step: NewStep,
        reporter: &mut dyn Reporter,
    ) -> Result<(TrackingRecord, SyncOutcome)> {
        if step.status.trim().is_empty() || step.location.trim().is_empty() {
            bail!("step status and location are required");
        }

        let mut record = self.require(code)?;
        record.normalize();
        let added = record.append_step(step);
        let message = format!("step {} ({} at {})", added.id, added.status, added.location);
        reporter.info(&format!("{}: {message}", record.code));

        let outcome = self.upsert(&record, reporter)?;
        Ok((record, outcome))
    }

    /// Remove the local copy. The cloud copy is left alone.
    pub fn delete(&self, code: &str) -> Result<bool> {
        self.store.delete(code)
    }

    /// Fetch a record from the cloud and keep it locally.
    pub fn pull(&self, code: &str, reporter: &mut dyn Reporter) -> Result<Option<TrackingRecord>> {
        let code = normalize_code(code);
        if !self.gateway.is_enabled() {
            reporter.warn("cloud sync is not configured");
            return Ok(None);
        }

        let Some(mut record) = self.gateway.fetch_by_code(&code) else {
            reporter.warn(&format!("{code}: not found in cloud"));
            return Ok(None);
        };
        record.normalize();
        self.store.put(&record)?;
        reporter.info(&format!("{}: pulled from cloud", record.code));
        Ok(Some(record))
    }

    /// Mirror the stored record to the cloud.
    pub fn push(&self, code: &str, reporter: &mut dyn Reporter) -> Result<SyncOutcome> {
        let record = self.require(code)?;
        if !self.gateway.is_enabled() {
            reporter.warn("cloud sync is not configured");
            return Ok(SyncOutcome::Skipped);
        }

        let outcome = self.sync(&record, reporter);
        if outcome == SyncOutcome::Failed {
            reporter.error(&format!("{}: push rejected by the cloud", record.code));
        }
        Ok(outcome)
    }

    /// Share link for a stored record.
    pub fn share_link(&self, code: &str) -> Result<String> {
        let record = self.require(code)?;
        Ok(build_share_link(
            &record,
            self.base_url(),
            self.gateway.is_enabled(),
        ))
    }

    /// Resolve a share link and keep the record locally.
    ///
    /// A code in the link is looked up in the cloud first; the embedded payload
    /// is used when the cloud has nothing.
    pub fn open_link(&self, link: &str, reporter: &mut dyn Reporter) -> Result<Option<TrackingRecord>> {
        let Some(shared) = parse_share_link(link) else {
            reporter.warn("link carries no tracking data");
            return Ok(None);
        };

        let from_cloud = shared
            .code
            .as_deref()
            .and_then(|code| self.gateway.fetch_by_code(code));

        let mut record = match (from_cloud, shared.record) {
            (Some(record), _) => {
                reporter.info(&format!("{}: loaded from cloud", record.normalized_code()));
                record
            }
            (None, Some(record)) => {
                reporter.info(&format!("{}: loaded from link", record.normalized_code()));
                record
            }
            (None, None) => {
                let code = shared.code.unwrap_or_default();
                reporter.warn(&format!("{code}: not found in cloud and link has no payload"));
                return Ok(None);
            }
        };

        record.normalize();
        self.store.put(&record)?;
        Ok(Some(record))
    }

    fn sync(&self, record: &TrackingRecord, reporter: &mut dyn Reporter) -> SyncOutcome {
        let Some(kind) = self.gateway.provider_kind() else {
            return SyncOutcome::Skipped;
        };

        if self.gateway.save(record) {
            reporter.info(&format!("{}: saved to {kind} cloud", record.code));
            SyncOutcome::Saved
        } else {
            reporter.warn(&format!(
                "{}: {kind} cloud save failed; kept locally",
                record.code
            ));
            SyncOutcome::Failed
        }
    }
}
