#![no_main]

use kassabon::extract::{amounts_in, parse_amount, percent_in};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let _ = parse_amount(s);
        let _ = amounts_in(s);
        let _ = percent_in(s);
    }
});
