#![no_main]
use geobin::format::{DatabaseMetadata, IndexTable};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Header validation must reject garbage without panicking
    if let Ok(meta) = DatabaseMetadata::parse(data) {
        let _ = meta.validate_geometry(data.len() as u64);
        let _ = meta.payload_start();
    }
    let _ = IndexTable::from_bytes(data);
});
