//! Share links for tracking records.
//!
//! A link carries the whole record as an encoded payload, so the receiver can
//! rebuild it without any backend:
//!
//! - cloud enabled: `<base>/?code=<CODE>&data=<PAYLOAD>`
//! - cloud disabled: `<base>/?data=<PAYLOAD>`
//!
//! With no base URL the link is relative (`/?data=...`).
//!
//! ```
//! use waybill_share::{build_share_link, parse_share_link};
//! use waybill_types::TrackingRecord;
//!
//! let record = TrackingRecord::new("ab12", "Macapá", "Boa Vista");
//! let link = build_share_link(&record, Some("https://x.test"), true);
//! assert!(link.starts_with("https://x.test/?code=AB12&data="));
//!
//! let shared = parse_share_link(&link).expect("parse");
//! assert_eq!(shared.code.as_deref(), Some("AB12"));
//! assert_eq!(shared.record, Some(record));
//! ```

use url::form_urlencoded;
use waybill_types::{TrackingRecord, normalize_code};

/// Query parameter carrying the uppercase code
pub const CODE_PARAM: &str = "code";

/// Query parameter carrying the encoded record
pub const DATA_PARAM: &str = "data";

/// Pick the base address for links: the persisted override wins over the
/// configured default. Blank values are ignored.
pub fn resolve_base_url<'a>(
    override_url: Option<&'a str>,
    default_url: Option<&'a str>,
) -> Option<&'a str> {
    let usable = |v: Option<&'a str>| v.map(str::trim).filter(|v| !v.is_empty());
    usable(override_url).or_else(|| usable(default_url))
}

/// Build a share link for `record`.
///
/// The code parameter is only added when a cloud provider is enabled, so the
/// receiver can try a cloud fetch before falling back to the payload.
pub fn build_share_link(record: &TrackingRecord, base: Option<&str>, cloud_enabled: bool) -> String {
    let base = base
        .map(|b| b.trim().trim_end_matches('/'))
        .unwrap_or_default();
    let payload = percent_encode(&waybill_codec::encode(record));

    if cloud_enabled {
        let code = percent_encode(&record.normalized_code());
        format!("{base}/?{CODE_PARAM}={code}&{DATA_PARAM}={payload}")
    } else {
        format!("{base}/?{DATA_PARAM}={payload}")
    }
}

/// What a share link carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedLink {
    /// Normalized code, when the link names one
    pub code: Option<String>,
    /// Embedded record, when the payload decodes
    pub record: Option<TrackingRecord>,
}

impl SharedLink {
    /// The code to look up: the explicit parameter, else the embedded
    /// record's code.
    pub fn lookup_code(&self) -> Option<String> {
        self.code
            .clone()
            .or_else(|| self.record.as_ref().map(TrackingRecord::normalized_code))
    }
}

/// Parse an absolute or relative share link.
///
/// Returns `None` when the link has neither a code nor a decodable payload.
pub fn parse_share_link(link: &str) -> Option<SharedLink> {
    let link = link.trim();
    let query = link.split_once('?').map(|(_, q)| q)?;
    let query = query.split_once('#').map_or(query, |(q, _)| q);

    let mut code = None;
    let mut record = None;
    for (key, value) in form_urlencoded::parse(query.as_bytes()) {
        match key.as_ref() {
            CODE_PARAM => {
                let normalized = normalize_code(&value);
                if !normalized.is_empty() {
                    code = Some(normalized);
                }
            }
            // A payload pasted without escaping turns `+` into spaces.
            DATA_PARAM => record = waybill_codec::decode(&value.replace(' ', "+")),
            _ => {}
        }
    }

    if code.is_none() && record.is_none() {
        return None;
    }
    Some(SharedLink { code, record })
}

fn percent_encode(value: &str) -> String {
    form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
