//! Request path matching for filter exemption lists.
//!
//! Patterns come in two forms:
//!
//! - **Exact**: `/actuator` matches only `/actuator` itself
//! - **Wildcard**: `/actuator/health/**` matches `/actuator/health`,
//!   `/actuator/health/db`, and everything beneath
//!
//! Matching is case-sensitive and byte-exact. `/HEALTH` does not match
//! `/health`, and `/health/` (trailing slash) does not match an exact
//! `/health` pattern. This strictness prevents accidental exemptions via
//! path manipulation.

/// Wildcard suffix denoting "this segment and everything beneath it".
const WILDCARD_SUFFIX: &str = "/**";

/// Check whether `path` matches any pattern in `patterns`.
///
/// Patterns are evaluated in order and the first match short-circuits.
/// Unmatched input simply returns `false`; this function never fails.
pub fn matches_any(path: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|pattern| matches_pattern(path, pattern))
}

fn matches_pattern(path: &str, pattern: &str) -> bool {
    if pattern == path {
        return true;
    }
    if let Some(prefix) = pattern.strip_suffix(WILDCARD_SUFFIX) {
        // The bare prefix itself counts: `/a/**` matches `/a` and `/a/b`.
        return path.starts_with(prefix);
    }
    false
}
