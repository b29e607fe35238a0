#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(payload) = std::str::from_utf8(data) else {
        return;
    };

    // Decoding never panics; whatever decodes must survive a round trip.
    if let Some(record) = waybill_codec::decode(payload) {
        let encoded = waybill_codec::encode(&record);
        assert_eq!(waybill_codec::decode(&encoded), Some(record));
    }
});
