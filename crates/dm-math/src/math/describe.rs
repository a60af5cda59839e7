//! Descriptive statistics over raw sample slices.
//!
//! Non-finite values (NaN, ±inf) mark missing measurements upstream and are
//! never treated as data here: every helper either filters them out or
//! documents that it expects a finite slice.

use std::cmp::Ordering;

/// Copy the finite values of `samples`, preserving order.
pub fn finite_samples(samples: &[f64]) -> Vec<f64> {
    samples.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Finite values of `samples` in ascending order.
pub fn sorted_finite(samples: &[f64]) -> Vec<f64> {
    let mut out = finite_samples(samples);
    out.sort_by(f64::total_cmp);
    out
}

/// Arithmetic mean. Returns NaN for an empty slice.
pub fn mean(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return f64::NAN;
    }
    samples.iter().sum::<f64>() / samples.len() as f64
}

/// Unbiased (n - 1) sample variance. Returns NaN when fewer than 2 values.
pub fn sample_variance(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n < 2 {
        return f64::NAN;
    }
    let m = mean(samples);
    let ss: f64 = samples.iter().map(|v| (v - m) * (v - m)).sum();
    ss / (n - 1) as f64
}

/// Unbiased sample standard deviation.
pub fn sample_std(samples: &[f64]) -> f64 {
    sample_variance(samples).sqrt()
}

/// Number of distinct values in a finite slice.
pub fn distinct_count(samples: &[f64]) -> usize {
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.dedup_by(|a, b| a.total_cmp(b) == Ordering::Equal);
    sorted.len()
}

/// Merge two ascending slices into one ascending vector (duplicates kept).
pub fn merge_sorted(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if a[i].total_cmp(&b[j]) != Ordering::Greater {
            out.push(a[i]);
            i += 1;
        } else {
            out.push(b[j]);
            j += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}
