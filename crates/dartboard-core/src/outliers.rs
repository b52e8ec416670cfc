//! Scalar outlier rejection used on radial keypoint distances and ICP pairs.
//!
//! Both filters return the indices to *remove*, in ascending order. Order
//! statistics use floor indexing into the sorted values (`sorted[n / 4]`,
//! `sorted[3n / 4]`, `sorted[n / 2]`) rather than interpolated quantiles, so the
//! flagged set is fully determined by the input.

use serde::{Deserialize, Serialize};

/// Tukey fence multiplier for the IQR filter.
pub const IQR_FENCE: f64 = 1.5;

/// Default MAD multiplier.
pub const MAD_K: f64 = 2.5;

/// Coarse keypoint filter selection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutlierStrategy {
    /// Drop values outside `[Q1 - 1.5 IQR, Q3 + 1.5 IQR]`.
    #[default]
    Iqr,
    /// Drop values above `median + k * MAD`.
    Mad { k: f64 },
}

impl OutlierStrategy {
    /// Indices of `values` rejected by this strategy.
    pub fn outlier_indices(&self, values: &[f64]) -> Vec<usize> {
        match *self {
            Self::Iqr => iqr_outlier_indices(values),
            Self::Mad { k } => mad_outlier_indices(values, k),
        }
    }
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut s = values.to_vec();
    s.sort_by(f64::total_cmp);
    s
}

/// `sorted[floor(n * q)]`, clamped to the last element.
fn floor_quantile(sorted: &[f64], q: f64) -> f64 {
    let idx = ((sorted.len() as f64 * q).floor() as usize).min(sorted.len() - 1);
    sorted[idx]
}

/// Indices of values outside the interquartile fences.
///
/// For `[1, 2, 3, 4, 5, 100]`: `Q1 = sorted[1] = 2`, `Q3 = sorted[4] = 5`,
/// fences `[-2.5, 9.5]`, so only index 5 is flagged.
pub fn iqr_outlier_indices(values: &[f64]) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }
    let s = sorted(values);
    let q1 = floor_quantile(&s, 0.25);
    let q3 = floor_quantile(&s, 0.75);
    let iqr = q3 - q1;
    let lower = q1 - IQR_FENCE * iqr;
    let upper = q3 + IQR_FENCE * iqr;

    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v < lower || v > upper)
        .map(|(i, _)| i)
        .collect()
}

/// Median (`sorted[n / 2]`) and median absolute deviation of `values`.
pub fn median_mad(values: &[f64]) -> Option<(f64, f64)> {
    if values.is_empty() {
        return None;
    }
    let median = floor_quantile(&sorted(values), 0.5);
    let deviations: Vec<f64> = values.iter().map(|v| (v - median).abs()).collect();
    let mad = floor_quantile(&sorted(&deviations), 0.5);
    Some((median, mad))
}

/// Indices of values strictly above `median + k * MAD`.
pub fn mad_outlier_indices(values: &[f64], k: f64) -> Vec<usize> {
    let Some((median, mad)) = median_mad(values) else {
        return Vec::new();
    };
    let limit = median + k * mad;
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > limit)
        .map(|(i, _)| i)
        .collect()
}

/// Keep the items whose index is not listed in `remove` (ascending indices).
pub fn retain_except<T: Clone>(items: &[T], remove: &[usize]) -> Vec<T> {
    let mut rm = remove.iter().copied().peekable();
    items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            while rm.next_if(|&r| r < i).is_some() {}
            if rm.next_if_eq(&i).is_some() {
                None
            } else {
                Some(item.clone())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iqr_flags_exact_indices() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert_eq!(iqr_outlier_indices(&values), vec![5]);
    }

    #[test]
    fn iqr_uses_floor_indexing_on_unsorted_input() {
        // sorted: [-50, 10, 11, 12, 13, 14, 15, 90] -> Q1 = sorted[2] = 11, Q3 = sorted[6] = 15
        // fences [5, 21]
        let values = [12.0, 90.0, 10.0, 15.0, -50.0, 13.0, 11.0, 14.0];
        assert_eq!(iqr_outlier_indices(&values), vec![1, 4]);
    }

    #[test]
    fn iqr_on_empty_and_constant_input() {
        assert!(iqr_outlier_indices(&[]).is_empty());
        assert!(iqr_outlier_indices(&[3.0; 7]).is_empty());
    }

    #[test]
    fn mad_rejects_only_upper_tail() {
        // median = sorted[3] = 4, deviations sorted [0,1,1,2,2,3,96] -> MAD = 2
        // limit = 4 + 2.5 * 2 = 9
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0];
        assert_eq!(mad_outlier_indices(&values, MAD_K), vec![6]);
        assert_eq!(median_mad(&values), Some((4.0, 2.0)));
    }

    #[test]
    fn strategy_dispatch() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 100.0];
        assert_eq!(OutlierStrategy::Iqr.outlier_indices(&values), vec![5]);
        assert_eq!(
            OutlierStrategy::Mad { k: MAD_K }.outlier_indices(&values),
            vec![5]
        );
    }

    #[test]
    fn retain_except_skips_listed_indices() {
        let items = ['a', 'b', 'c', 'd', 'e'];
        assert_eq!(retain_except(&items, &[1, 3]), vec!['a', 'c', 'e']);
        assert_eq!(retain_except(&items, &[]), items.to_vec());
    }
}
