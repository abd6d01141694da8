#![no_main]

use libfuzzer_sys::fuzz_target;
use benchio::iostat::SampleParser;

fuzz_target!(|data: &[u8]| {
    // Captures are read lossily, so any bytes can reach the parser
    let capture = String::from_utf8_lossy(data);
    let parser = SampleParser::new("nvme2n1");
    let _ = parser.parse_capture(&capture);
});
