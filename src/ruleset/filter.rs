//! Filter evaluation
//!
//! Filters reject hits before the comparatively expensive matching
//! strategies run. Evaluation never fails: anything that cannot be compared
//! simply does not pass.

use super::field::{HitField, extract_field};
use super::pattern::pattern_matches;
use super::{Filter, FilterOperator};
use crate::catalog::RawHit;

/// Evaluates a single filter against `hit`.
pub fn passes_filter(hit: &RawHit, filter: &Filter) -> bool {
    let field_value = extract_field(hit, &filter.attribute);

    match filter.operator {
        FilterOperator::ExactMatch => field_value.to_lowercase() == filter.value.to_lowercase(),
        FilterOperator::Contains => field_value
            .to_lowercase()
            .contains(&filter.value.to_lowercase()),
        FilterOperator::Regex => pattern_matches(&filter.value, &field_value),
        FilterOperator::GreaterThan => {
            compare_numeric(filter, &field_value).is_some_and(|(lhs, rhs)| lhs > rhs)
        }
        FilterOperator::LessThan => {
            compare_numeric(filter, &field_value).is_some_and(|(lhs, rhs)| lhs < rhs)
        }
        FilterOperator::Unknown => false,
    }
}

/// Evaluates all filters; a hit must satisfy every one of them.
pub fn passes_all(hit: &RawHit, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| passes_filter(hit, filter))
}

/// Parses both sides of a numeric comparison.
///
/// Rule sets state duration thresholds in minutes while hits carry seconds,
/// so the filter value is scaled for the duration field.
fn compare_numeric(filter: &Filter, field_value: &str) -> Option<(f64, f64)> {
    let lhs: f64 = field_value.trim().parse().ok()?;
    let mut rhs: f64 = filter.value.trim().parse().ok()?;

    if HitField::from_name(&filter.attribute) == Some(HitField::Duration) {
        rhs *= 60.0;
    }

    Some((lhs, rhs))
}
