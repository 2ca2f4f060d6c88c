//! Decoding arbitrary bytes as a trace record must never panic, and a record
//! that decodes must encode again.

#![no_main]

use libfuzzer_sys::fuzz_target;
use qtrace_core::export;

fuzz_target!(|data: &[u8]| {
    let Ok(json) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(trace) = export::from_json(json) {
        let again = export::to_json(&trace).expect("decoded trace must re-encode");
        let back = export::from_json(&again).expect("re-encoded trace must decode");
        assert_eq!(back.stream_len(), trace.stream_len());
        assert_eq!(back.pcap, trace.pcap);
    }
});
