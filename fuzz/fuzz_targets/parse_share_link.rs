#![no_main]

use libfuzzer_sys::fuzz_target;
use waybill_share::{build_share_link, parse_share_link};

fuzz_target!(|data: &[u8]| {
    let Ok(link) = std::str::from_utf8(data) else {
        return;
    };

    if let Some(shared) = parse_share_link(link) {
        if let Some(code) = &shared.code {
            assert_eq!(code, &waybill_types::normalize_code(code));
        }
        if let Some(record) = shared.record {
            let rebuilt = build_share_link(&record, Some("https://x.test"), false);
            assert_eq!(parse_share_link(&rebuilt).and_then(|s| s.record), Some(record));
        }
    }
});
