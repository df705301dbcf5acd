//! Rule set patterns
//!
//! Patterns authored in rule sets may use look-around, so they are compiled
//! with `fancy_regex`. Compiled patterns are cached process-wide; malformed
//! patterns are cached as `None` so they are reported only once.

use fancy_regex::Regex;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock};
use tracing::warn;

static PATTERN_CACHE: LazyLock<Mutex<HashMap<String, Option<Arc<Regex>>>>> =
    LazyLock::new(Default::default);

/// Compiles `pattern`, returning `None` if it is malformed.
pub fn compile_pattern(pattern: &str) -> Option<Arc<Regex>> {
    let mut cache = PATTERN_CACHE.lock();

    if let Some(entry) = cache.get(pattern) {
        return entry.clone();
    }

    let compiled = match Regex::new(pattern) {
        Ok(regex) => Some(Arc::new(regex)),
        Err(e) => {
            warn!(pattern, error = %e, "ignoring malformed rule set pattern");
            None
        }
    };

    cache.insert(pattern.to_string(), compiled.clone());
    compiled
}

/// The last capture group of the first match of `regex` in `haystack`.
///
/// A pattern without groups yields the whole match; a last group that did
/// not participate in the match yields an empty string. Matching errors
/// (e.g. backtracking limits) count as no match.
pub fn last_capture(regex: &Regex, haystack: &str) -> Option<String> {
    let captures = regex.captures(haystack).ok()??;
    let last = captures.len() - 1;

    Some(
        captures
            .get(last)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default(),
    )
}

/// Whether `pattern` matches anywhere in `haystack`; malformed patterns never match.
pub(crate) fn pattern_matches(pattern: &str, haystack: &str) -> bool {
    compile_pattern(pattern)
        .is_some_and(|regex| regex.is_match(haystack).unwrap_or(false))
}
