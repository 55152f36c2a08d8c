#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(addr) = geobin::canonicalize(text) {
            let _ = addr.bucket();
        }
        let _ = geobin::address::expand_ipv6(text);
    }
});
