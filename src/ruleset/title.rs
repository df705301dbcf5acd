//! Title building
//!
//! Expands a rule set's title rules into a single candidate title.

use super::TitleRule;
use super::field::extract_field;
use super::pattern::{compile_pattern, last_capture};
use crate::catalog::RawHit;

/// Builds the candidate title for `hit`.
///
/// Static fragments are appended verbatim. Regex fragments append the last
/// capture group of the first match against their field; an empty field
/// contributes nothing. Returns `None` if a regex fragment's field is
/// non-empty but its pattern does not match (or does not compile).
pub fn build_title(hit: &RawHit, rules: &[TitleRule]) -> Option<String> {
    let mut title = String::new();

    for rule in rules {
        match rule {
            TitleRule::Static { value } => title.push_str(value),
            TitleRule::Regex { field, pattern } => {
                let field_value = extract_field(hit, field);
                if field_value.is_empty() {
                    continue;
                }

                let regex = compile_pattern(pattern)?;
                title.push_str(&last_capture(&regex, &field_value)?);
            }
        }
    }

    Some(title)
}
