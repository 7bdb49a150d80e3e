#![no_main]

use libfuzzer_sys::fuzz_target;
use pue_oracle::csv_io;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Single rows and whole tables must never panic
        let _ = csv_io::parse_observation_line(input, 2);
        let _ = csv_io::read_observations(input.as_bytes());
    }
});
