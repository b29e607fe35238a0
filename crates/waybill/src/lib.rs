//! # Waybill
//!
//! Shipment tracking records kept locally, optionally mirrored to a cloud
//! document store, and shared as self-contained links.
//!
//! ## Features
//!
//! - **Local store**: records live on this machine as one JSON file per code
//!   ([`storage::FileRecordStore`]).
//! - **Optional cloud mirror**: a row store or a document store, selected once
//!   from configuration. With neither configured every cloud call is a no-op.
//! - **Container fallback**: reads and writes try the configured container
//!   first and the legacy name second.
//! - **Share links**: a link embeds the whole record, so it opens without any
//!   backend. With cloud sync enabled the link also names the code, and the
//!   receiver prefers the cloud copy.
//!
//! ## Flow
//!
//! [`Tracker`] ties the pieces together the way the admin dashboard does:
//! every edit is written locally first, then pushed to the cloud, and the
//! outcome of the push is reported as a [`SyncOutcome`]. Nothing here prints;
//! progress goes to a caller-supplied [`Reporter`].
//!
//! ## Example
//!
//! ```
//! use waybill::{Reporter, SyncOutcome, Tracker};
//! use waybill::cloud::CloudGateway;
//! use waybill::storage::MemoryRecordStore;
//! use waybill::types::{NewStep, TrackingRecord};
//!
//! struct Quiet;
//! impl Reporter for Quiet {
//!     fn info(&mut self, _: &str) {}
//!     fn warn(&mut self, _: &str) {}
//!     fn error(&mut self, _: &str) {}
//! }
//!
//! let tracker = Tracker::new(MemoryRecordStore::new(), CloudGateway::disabled());
//! let record = TrackingRecord::new("ab12", "Recife", "Natal");
//! assert_eq!(tracker.upsert(&record, &mut Quiet)?, SyncOutcome::Skipped);
//!
//! let (updated, _) = tracker.add_step("AB12", NewStep::new("Em trânsito", "Recife"), &mut Quiet)?;
//! assert_eq!(updated.status, "Em trânsito");
//! assert!(tracker.share_link("ab12")?.starts_with("/?data="));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use waybill_cloud as cloud;
pub use waybill_codec as codec;
pub use waybill_config as config;
pub use waybill_share as share;
pub use waybill_storage as storage;
pub use waybill_types as types;

pub mod tracker;

pub use tracker::{Reporter, SyncOutcome, Tracker};
