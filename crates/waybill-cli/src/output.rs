//! Plain-text rendering for command output.

use waybill::SyncOutcome;
use waybill::config::{Config, ShareSettings, mask_secret};
use waybill::types::TrackingRecord;

const UNSET: &str = "-";

fn or_unset(value: &str) -> &str {
    if value.trim().is_empty() { UNSET } else { value }
}

pub fn record_table(records: &[TrackingRecord]) -> String {
    if records.is_empty() {
        return "no records".to_string();
    }

    records
        .iter()
        .map(|r| {
            format!(
                "{:<12} {:<20} {} -> {} ({} steps)",
                r.code,
                or_unset(&r.status),
                r.origin,
                r.destination,
                r.steps.len()
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn record_details(record: &TrackingRecord) -> String {
    let mut lines = vec![
        format!("code: {}", record.code),
        format!("origin: {}", or_unset(&record.origin)),
        format!("destination: {}", or_unset(&record.destination)),
        format!("current_location: {}", or_unset(&record.current_location)),
        format!("estimated_delivery: {}", or_unset(&record.estimated_delivery)),
        format!("status: {}", or_unset(&record.status)),
    ];

    if record.steps.is_empty() {
        lines.push("steps: none".to_string());
    } else {
        lines.push("steps:".to_string());
        for (idx, step) in record.steps.iter().enumerate() {
            let marker = if step.is_current { " (current)" } else { "" };
            lines.push(format!(
                "{:>3}. {} {} {} @ {}{marker}",
                idx + 1,
                step.date,
                step.time,
                step.status,
                step.location
            ));
        }
    }

    lines.join("\n")
}

pub fn sync_line(code: &str, outcome: SyncOutcome) -> String {
    format!("{code}: saved locally, cloud {outcome}")
}

pub fn config_summary(config: &Config, settings: &ShareSettings) -> String {
    let secret = |value: &Option<String>| {
        value
            .as_deref()
            .filter(|v| !v.trim().is_empty())
            .map(mask_secret)
            .unwrap_or_else(|| UNSET.to_string())
    };
    let plain = |value: &Option<String>| or_unset(value.as_deref().unwrap_or_default()).to_string();

    let provider = config
        .cloud()
        .selected_provider()
        .map(|kind| kind.to_string())
        .unwrap_or_else(|| "none".to_string());

    let base_url = match (settings.public_base_url(), config.public_base_url()) {
        (Some(url), _) => format!("{url} (override)"),
        (None, Some(url)) => format!("{url} (config)"),
        (None, None) => UNSET.to_string(),
    };

    [
        format!("store_dir: {}", config.store_dir().display()),
        format!("cloud_provider: {provider}"),
        format!("rest.url: {}", plain(&config.rest.url)),
        format!("rest.anon_key: {}", secret(&config.rest.anon_key)),
        format!("rest.table: {}", config.rest.table()),
        format!("firestore.project_id: {}", plain(&config.firestore.project_id)),
        format!("firestore.api_key: {}", secret(&config.firestore.api_key)),
        format!("firestore.collection: {}", config.firestore.collection()),
        format!("firestore.endpoint: {}", config.firestore.endpoint()),
        format!("public_base_url: {base_url}"),
        format!("http.timeout_secs: {}", config.http.timeout_secs),
    ]
    .join("\n")
}
