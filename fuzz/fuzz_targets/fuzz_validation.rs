//! Fuzz testing for the validators and the path classifier.
//!
//! Ensures that on arbitrary input these functions:
//!
//! - Never panic
//! - Always return a valid Result (Ok or Err)
//! - Handle edge cases like empty strings, long strings, and non-ASCII input
//!
//! # Running the Fuzz Tests
//!
//! ```bash
//! cargo +nightly install cargo-fuzz
//! cargo +nightly fuzz run fuzz_validation
//! cargo +nightly fuzz run fuzz_validation -- -max_total_time=60
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use rag_store::middleware::paths::matches_any;
use rag_store::validation::{validate_pagination, validate_title, validate_user_id};

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        // String validators (shouldn't panic)
        let _ = validate_user_id(Some(s));
        let _ = validate_title(Some(s));

        // Path matching against both real exemption lists and the input
        // itself used as a pattern
        let _ = matches_any(s, rag_store::middleware::PUBLIC_ENDPOINTS);
        let _ = matches_any(s, rag_store::middleware::SKIP_LOGGING_PATHS);
        let _ = matches_any("/api/v1/sessions", &[s]);
        let _ = matches_any(s, &[s]);
    }

    // Numeric validation across boundary conditions
    if data.len() >= 16 {
        let page = i64::from_le_bytes([
            data[0], data[1], data[2], data[3], data[4], data[5], data[6], data[7],
        ]);
        let size = i64::from_le_bytes([
            data[8], data[9], data[10], data[11], data[12], data[13], data[14], data[15],
        ]);
        let _ = validate_pagination(page, size);
    }
});
