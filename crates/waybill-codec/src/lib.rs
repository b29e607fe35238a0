//! Share payload codec for tracking records.
//!
//! A record is serialized to compact JSON, taken as UTF-8 bytes and encoded
//! with the standard base64 alphabet (with padding). Working on bytes keeps
//! non-ASCII text intact.
//!
//! Decoding is total: malformed input yields `None`, never a panic.
//!
//! ```
//! use waybill_codec::{decode, encode};
//! use waybill_types::TrackingRecord;
//!
//! let record = TrackingRecord::new("AB12", "Belém", "Goiânia");
//! let payload = encode(&record);
//!
//! assert_eq!(decode(&payload), Some(record));
//! assert_eq!(decode("not a payload"), None);
//! ```

use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use waybill_types::TrackingRecord;

/// Why a payload could not be decoded.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload does not contain a tracking record: {0}")]
    Record(#[from] serde_json::Error),
}

/// Encode a record into a base64 payload.
pub fn encode(record: &TrackingRecord) -> String {
    // Records hold only strings and booleans; serialization cannot fail.
    let json = serde_json::to_vec(record).unwrap_or_default();
    BASE64.encode(json)
}

/// Decode a payload, reporting why it failed.
pub fn try_decode(payload: &str) -> Result<TrackingRecord, DecodeError> {
    let bytes = BASE64.decode(payload.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Decode a payload. Any malformed input yields `None`.
pub fn decode(payload: &str) -> Option<TrackingRecord> {
    try_decode(payload).ok()
}

/// Whether `payload` only uses the standard base64 alphabet plus padding.
pub fn is_payload_alphabet(payload: &str) -> bool {
    payload
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
}
