//! Order statistics shared by the normalizer, prioritizer and summaries.
//!
//! Quantiles use inclusive linear interpolation: for `n` sorted values the
//! q-quantile sits at fractional index `(n - 1) * q`.

use serde::{Deserialize, Serialize};

/// Finite values sorted ascending.
pub fn sorted_finite<I: IntoIterator<Item = f64>>(values: I) -> Vec<f64> {
    let mut v: Vec<f64> = values.into_iter().filter(|x| x.is_finite()).collect();
    v.sort_by(f64::total_cmp);
    v
}

/// Quantile of an ascending slice. `None` for an empty slice.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    let frac = h - lo as f64;
    Some(sorted[lo] + frac * (sorted[hi] - sorted[lo]))
}

/// Quantile of unsorted values; non-finite values are ignored.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    quantile_sorted(&sorted_finite(values.iter().copied()), q)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Median and inter-quartile range of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Distribution {
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
}

impl Distribution {
    pub fn of(values: &[f64]) -> Option<Self> {
        let sorted = sorted_finite(values.iter().copied());
        Some(Self {
            median: quantile_sorted(&sorted, 0.5)?,
            q25: quantile_sorted(&sorted, 0.25)?,
            q75: quantile_sorted(&sorted, 0.75)?,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q75 - self.q25
    }
}

/// Percentile rank in [0,1] of every value by ascending position.
///
/// The lowest value ranks 0 and the highest 1; ties share the mean of
/// their positions. A single value (or all-equal values) ranks 0.5.
/// Output order matches input order.
pub fn percentile_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => return Vec::new(),
        1 => return vec![0.5],
        _ => {}
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && values[order[j + 1]] == values[order[i]] {
            j += 1;
        }
        let avg_position = (i + j) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg_position / (n - 1) as f64;
        }
        i = j + 1;
    }
    ranks
}
