//! Fuzz testing for request text handling.
//!
//! Feeds arbitrary strings through field validation, markup stripping and
//! timezone resolution. None of them may panic, and accepted fields must
//! be non-empty and trimmed.
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_request_text -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use voice_agent_backend::services::{resolve_timezone, strip_markup};
use voice_agent_backend::validation::require_text;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };

    if let Ok(value) = require_text(Some(s.to_string()), "missing") {
        assert!(!value.is_empty());
        assert_eq!(value, value.trim());
        assert_eq!(value, s.trim());
    }

    let stripped = strip_markup(s);
    if !s.contains('&') {
        assert!(stripped.len() <= s.len());
    }

    let _ = resolve_timezone(s);
});
