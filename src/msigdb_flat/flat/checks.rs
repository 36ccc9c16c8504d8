// threshold and identity checks used while building the flat tables.
// every builder stage runs its checks with `?` so the first failing check
// aborts the whole build, nothing is ever written from a snapshot that
// fails one

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use flexstr::SharedStr as FlexStr;

use crate::error::{FlatResult, FlatTableError};
use crate::utils::sample_join;

const MAX_REPORTED_ITEMS: usize = 10;

pub fn check_min_count(what: &str, count: usize, min: usize) -> FlatResult<()> {
    if count < min {
        return Err(FlatTableError::Validation(
            format!("{}: {} is below the minimum of {}", what, count, min)));
    }
    Ok(())
}

pub fn check_max_count(what: &str, count: usize, max: usize) -> FlatResult<()> {
    if count > max {
        return Err(FlatTableError::Validation(
            format!("{}: {} is above the maximum of {}", what, count, max)));
    }
    Ok(())
}

pub fn check_count_range(what: &str, count: usize, range: &RangeInclusive<usize>)
                         -> FlatResult<()>
{
    if !range.contains(&count) {
        return Err(FlatTableError::Validation(
            format!("{}: {} is outside the expected range {}..={}",
                    what, count, range.start(), range.end())));
    }
    Ok(())
}

pub fn check_min_fraction(what: &str, numerator: usize, denominator: usize,
                          min_fraction: f64) -> FlatResult<()>
{
    let fraction = if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    };

    if fraction < min_fraction {
        return Err(FlatTableError::Validation(
            format!("{}: {}/{} = {:.4} is below the minimum fraction {}",
                    what, numerator, denominator, fraction, min_fraction)));
    }
    Ok(())
}

pub fn check_ratio_range(what: &str, numerator: usize, denominator: usize,
                         range: &RangeInclusive<f64>) -> FlatResult<()>
{
    let ratio = if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    };

    if !range.contains(&ratio) {
        return Err(FlatTableError::Validation(
            format!("{}: {}/{} = {:.4} is outside the expected range {}..={}",
                    what, numerator, denominator, ratio,
                    range.start(), range.end())));
    }
    Ok(())
}

pub fn median(values: &[usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_unstable();
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) as f64 / 2.0
    } else {
        sorted[mid] as f64
    }
}

pub fn check_max_median(what: &str, values: &[usize], max: f64) -> FlatResult<()> {
    let median_value = median(values);

    if median_value > max {
        return Err(FlatTableError::Validation(
            format!("median {}: {} is above the maximum of {}",
                    what, median_value, max)));
    }
    Ok(())
}

pub fn check_equal_counts(what: &str, left_desc: &str, left: usize,
                          right_desc: &str, right: usize) -> FlatResult<()>
{
    if left != right {
        return Err(FlatTableError::Validation(
            format!("{}: {} ({}) differs from {} ({})",
                    what, left_desc, left, right_desc, right)));
    }
    Ok(())
}

// the two sets must be identical, a subset in either direction fails
pub fn check_same_set(what: &str, expected: &BTreeSet<FlexStr>,
                      actual: &BTreeSet<FlexStr>) -> FlatResult<()>
{
    let missing: Vec<_> = expected.difference(actual).cloned().collect();
    let unexpected: Vec<_> = actual.difference(expected).cloned().collect();

    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(FlatTableError::Validation(
            format!("{}: {} missing [{}], {} unexpected [{}]",
                    what,
                    missing.len(), sample_join(&missing, MAX_REPORTED_ITEMS, ", "),
                    unexpected.len(),
                    sample_join(&unexpected, MAX_REPORTED_ITEMS, ", "))));
    }
    Ok(())
}

// every member of expected must appear in superset
pub fn check_subset(what: &str, expected: &BTreeSet<FlexStr>,
                    superset: &BTreeSet<FlexStr>) -> FlatResult<()>
{
    let missing: Vec<_> = expected.difference(superset).cloned().collect();

    if !missing.is_empty() {
        return Err(FlatTableError::Validation(
            format!("{}: {} missing [{}]", what, missing.len(),
                    sample_join(&missing, MAX_REPORTED_ITEMS, ", "))));
    }
    Ok(())
}

// the two sets must not overlap
pub fn check_disjoint(what: &str, left: &BTreeSet<FlexStr>,
                      right: &BTreeSet<FlexStr>) -> FlatResult<()>
{
    let overlap: Vec<_> = left.intersection(right).cloned().collect();

    if !overlap.is_empty() {
        return Err(FlatTableError::Consistency(
            format!("{}: {} in both sets [{}]", what, overlap.len(),
                    sample_join(&overlap, MAX_REPORTED_ITEMS, ", "))));
    }
    Ok(())
}
