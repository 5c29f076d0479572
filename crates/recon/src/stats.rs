//! Median-first descriptive statistics over percentage collections.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statistics {
    /// Primary metric.
    pub median: f64,
    /// Secondary metric, rounded to 1 decimal.
    pub average: f64,
    pub min: f64,
    pub max: f64,
    pub q1: f64,
    pub q3: f64,
    /// Sample standard deviation, rounded to 1 decimal; 0 for a single value.
    pub std: f64,
    pub count: usize,
    pub below_median_count: usize,
    pub below_threshold_count: usize,
}

/// Round half away from zero to one decimal place.
pub fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// `score / total * 100`, rounded to 1 decimal; 0 when there are no questions.
pub fn percentage(score: i64, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round1(score as f64 / total as f64 * 100.0)
}

/// Standard median: mean of the two middle order statistics for even n.
pub fn median(values: &[f64]) -> Option<f64> {
    let sorted = sorted(values);
    median_of_sorted(&sorted)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Quantile with linear interpolation between closest ranks (`p` in 0..=1).
pub fn quantile(values: &[f64], p: f64) -> Option<f64> {
    let sorted = sorted(values);
    quantile_of_sorted(&sorted, p)
}

/// Describe a percentage collection. `None` when it is empty.
pub fn describe(values: &[f64], threshold: f64) -> Option<Statistics> {
    let sorted = sorted(values);
    let n = sorted.len();
    let median = median_of_sorted(&sorted)?;
    let avg = mean(&sorted)?;

    let std = if n > 1 {
        let var = sorted.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / (n - 1) as f64;
        round1(var.sqrt())
    } else {
        0.0
    };

    Some(Statistics {
        median,
        average: round1(avg),
        min: sorted[0],
        max: sorted[n - 1],
        q1: quantile_of_sorted(&sorted, 0.25)?,
        q3: quantile_of_sorted(&sorted, 0.75)?,
        std,
        count: n,
        below_median_count: sorted.iter().filter(|&&v| v < median).count(),
        below_threshold_count: sorted.iter().filter(|&&v| v < threshold).count(),
    })
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(f64::total_cmp);
    v
}

fn median_of_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n % 2 == 1 {
        Some(sorted[n / 2])
    } else {
        Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0)
    }
}

fn quantile_of_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = p.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}
