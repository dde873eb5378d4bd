//! Fuzz target for audit event decoding.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(tx) = serde_json::from_slice::<pfg_consensus::EventsTx>(data) {
        let encoded = tx.to_bytes().ok();
        let decoded = encoded.and_then(|bytes| {
            serde_json::from_slice::<pfg_consensus::EventsTx>(&bytes).ok()
        });
        assert_eq!(decoded, Some(tx));
    }
});
