#![no_main]
use libfuzzer_sys::fuzz_target;
use std::io::Write;

fuzz_target!(|data: &[u8]| {
    // Arbitrary file contents, queried in both access modes
    let Ok(mut file) = tempfile::NamedTempFile::new() else {
        return;
    };
    if file.write_all(data).is_err() {
        return;
    }
    for memory_map in [true, false] {
        if let Ok(db) = geobin::Database::open(file.path(), memory_map) {
            for address in ["0.0.0.0", "8.8.8.8", "255.255.255.255", "2001:db8::1", "::"] {
                let _ = db.query(address);
            }
        }
    }
});
