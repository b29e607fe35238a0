//! Core domain types for waybill.
//!
//! A [`TrackingRecord`] is one shipment: a code, its route, a status line and
//! the ordered history of [`TrackingStep`]s. Steps are kept in the order they
//! were entered, which is not necessarily date order.
//!
//! # Example
//!
//! ```
//! use waybill_types::{NewStep, TrackingRecord};
//!
//! let mut record = TrackingRecord::new("ab12", "São Paulo", "Recife");
//! assert_eq!(record.code, "AB12");
//!
//! record.append_step(NewStep::new("Postado", "São Paulo"));
//! record.append_step(NewStep::new("Em trânsito", "Salvador"));
//!
//! assert_eq!(record.status, "Em trânsito");
//! assert_eq!(record.current_step().map(|s| s.location.as_str()), Some("Salvador"));
//! ```

use chrono::{Local, Utc};
use serde::{Deserialize, Serialize};

/// Date format used when a step is entered without an explicit date.
pub const STEP_DATE_FORMAT: &str = "%d/%m/%Y";

/// Time format used when a step is entered without an explicit time.
pub const STEP_TIME_FORMAT: &str = "%H:%M";

/// Normalize a tracking code to its canonical form: surrounding whitespace
/// removed, then uppercased. `" ab12"` and `"AB12"` name the same record.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

/// One movement or status event in a record's history.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStep {
    /// Unique token within the owning record
    pub id: String,
    pub status: String,
    pub location: String,
    /// Locale-formatted date, never parsed
    pub date: String,
    /// Locale-formatted time, never parsed
    pub time: String,
    pub is_completed: bool,
    pub is_current: bool,
}

/// A shipment tracking entry keyed by its code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingRecord {
    /// Unique key in every store; canonical form is uppercase
    pub code: String,
    pub origin: String,
    pub destination: String,
    #[serde(default)]
    pub current_location: String,
    pub estimated_delivery: String,
    pub status: String,
    /// Entry order, oldest first
    #[serde(default)]
    pub steps: Vec<TrackingStep>,
}

impl TrackingRecord {
    /// Create a record with no steps. The code is normalized.
    pub fn new(
        code: impl AsRef<str>,
        origin: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            code: normalize_code(code.as_ref()),
            origin: origin.into(),
            destination: destination.into(),
            ..Default::default()
        }
    }

    /// Set the current location
    pub fn with_current_location(mut self, location: impl Into<String>) -> Self {
        self.current_location = location.into();
        self
    }

    /// Set the estimated delivery text
    pub fn with_estimated_delivery(mut self, estimate: impl Into<String>) -> Self {
        self.estimated_delivery = estimate.into();
        self
    }

    /// Set the status line
    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    /// The code in canonical form, regardless of how it was stored.
    pub fn normalized_code(&self) -> String {
        normalize_code(&self.code)
    }

    /// Rewrite the code into canonical form.
    pub fn normalize(&mut self) {
        self.code = normalize_code(&self.code);
    }

    /// The step flagged as current, if any.
    pub fn current_step(&self) -> Option<&TrackingStep> {
        self.steps.iter().rev().find(|s| s.is_current)
    }

    /// Append a step built from `new` and make it the current one.
    ///
    /// The record status follows the new step's status.
    pub fn append_step(&mut self, new: NewStep) -> &TrackingStep {
        let id = self.next_step_id();
        let step = new.into_step(id);
        self.status = step.status.clone();
        self.push_current_step(step)
    }

    /// Append `step` as the current step, clearing the flag on every prior
    /// step first. At most one step is current afterwards.
    pub fn push_current_step(&mut self, mut step: TrackingStep) -> &TrackingStep {
        for prior in &mut self.steps {
            prior.is_current = false;
        }
        step.is_current = true;

        let idx = self.steps.len();
        self.steps.push(step);
        &self.steps[idx]
    }

    /// Number of steps flagged as current. Zero or one for well-formed records.
    pub fn current_step_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_current).count()
    }

    /// Timestamp-derived id, bumped until it is unused within this record.
    fn next_step_id(&self) -> String {
        let mut candidate = Utc::now().timestamp_millis();
        while self.steps.iter().any(|s| s.id == candidate.to_string()) {
            candidate += 1;
        }
        candidate.to_string()
    }
}

/// Input for a new step. Missing date/time default to the local clock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewStep {
    pub status: String,
    pub location: String,
    pub date: Option<String>,
    pub time: Option<String>,
}

impl NewStep {
    /// Create a step input with the given status and location
    pub fn new(status: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            status: status.into(),
            location: location.into(),
            date: None,
            time: None,
        }
    }

    /// Set an explicit date
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Set an explicit time
    pub fn with_time(mut self, time: impl Into<String>) -> Self {
        self.time = Some(time.into());
        self
    }

    /// Build the step. Entered steps are always completed and current.
    pub fn into_step(self, id: String) -> TrackingStep {
        let now = Local::now();
        let date = self
            .date
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| now.format(STEP_DATE_FORMAT).to_string());
        let time = self
            .time
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| now.format(STEP_TIME_FORMAT).to_string());

        TrackingStep {
            id,
            status: self.status,
            location: self.location,
            date,
            time,
            is_completed: true,
            is_current: true,
        }
    }
}
