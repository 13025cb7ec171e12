//! Fuzz target: snippet capability scanner.
//!
//! Arbitrary snippet text must scan without panicking, and every
//! reported acquisition must be authorizable against the built-in
//! registry.
#![no_main]

use libfuzzer_sys::fuzz_target;

use lancet_policy::AllowListRegistry;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };
    let registry = AllowListRegistry::builtin();
    for name in lancet_policy::scan_acquisitions(source) {
        let _ = registry.authorize(&name);
    }
});
