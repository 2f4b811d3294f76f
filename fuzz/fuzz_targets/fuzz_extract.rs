#![no_main]

use chrono::NaiveDate;
use kassabon::core::{MimeHint, RawInput};
use kassabon::extract::{Extractor, TextExtractor, detect_language};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let _ = detect_language(text);
    let Some(date) = NaiveDate::from_ymd_opt(2025, 1, 15) else {
        return;
    };
    if let Ok(input) = RawInput::new(text, 1.0, date, MimeHint::Image) {
        if let Ok(record) = TextExtractor::default().extract(&input) {
            assert!((0.0..=1.0).contains(&record.extraction_confidence));
        }
    }
});
