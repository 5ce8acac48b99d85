#![no_main]

use gamestats_protocol::config::{ProtocolConfig, RequestVersion};
use gamestats_protocol::core::decrypt_request;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Fuzz request decoding - test for panics on arbitrary `data` parameters
    let Ok(input) = std::str::from_utf8(data) else {
        return;
    };

    for version in [RequestVersion::V1, RequestVersion::V2, RequestVersion::V3] {
        if let Ok(config) = ProtocolConfig::builder("TXqjDDOLhPySKSztgBHY", "fuzz")
            .rng(114069, 32153, 512)
            .hash_mask(0x613c_4964)
            .request_version(version)
            .build()
        {
            let _ = decrypt_request(&config, input);
        }
    }
});
