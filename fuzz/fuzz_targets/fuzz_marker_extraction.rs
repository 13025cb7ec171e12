//! Fuzz target: worker output marker extraction.
//!
//! Feeds arbitrary bytes through the marker extractor and the wire
//! report parser. Neither must ever panic, regardless of what a worker
//! managed to write before dying.
#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Some(payload) = lancet_executor::extract_marked_report(data) {
        let _ = serde_json::from_slice::<lancet_executor::WireReport>(payload);
    }
});
