#![no_main]

use libfuzzer_sys::fuzz_target;
use qtrace_core::RecorderConfig;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = RecorderConfig::from_yaml_str(s);
    }
});
