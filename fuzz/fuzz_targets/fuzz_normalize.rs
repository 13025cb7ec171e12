//! Fuzz target: result normalizer.
//!
//! Any JSON document a worker reports must either normalize or fail
//! with a typed error; panics and stack overflows are the forbidden
//! outcomes.
#![no_main]

use libfuzzer_sys::fuzz_target;

use lancet_core::{normalize, RawSentinels};

fuzz_target!(|data: &[u8]| {
    let Ok(value) = serde_json::from_slice::<serde_json::Value>(data) else {
        return;
    };
    let _ = normalize(&RawSentinels::new(value.clone(), serde_json::Value::Null));
    let _ = normalize(&RawSentinels::new(serde_json::Value::Null, value));
});
