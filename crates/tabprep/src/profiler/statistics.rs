//! Descriptive statistics over finite values.
//!
//! All functions take the values by reference and sort a copy when order
//! statistics are needed. Sums run over the sorted values, so results do not
//! depend on the order the values arrive in.

/// Closed interval outside of which a value is an outlier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub lower: f64,
    pub upper: f64,
}

impl OutlierBounds {
    /// Tukey fences `[q1 - k*iqr, q3 + k*iqr]`.
    pub fn iqr(q1: f64, q3: f64, k: f64) -> Self {
        let iqr = q3 - q1;
        Self {
            lower: q1 - k * iqr,
            upper: q3 + k * iqr,
        }
    }

    /// Values on a bound are inside.
    #[inline]
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }

    /// Nearer bound for values outside, the value itself otherwise.
    #[inline]
    pub fn clamp(&self, value: f64) -> f64 {
        if value < self.lower {
            self.lower
        } else if value > self.upper {
            self.upper
        } else {
            value
        }
    }

    pub fn count_outside(&self, values: &[f64]) -> usize {
        values.iter().filter(|v| !self.contains(**v)).count()
    }
}

/// Summary statistics of a non-empty set of finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    /// Population standard deviation.
    pub std: f64,
    pub q1: f64,
    pub q3: f64,
    pub iqr: f64,
    pub skewness: f64,
    /// Excess kurtosis.
    pub kurtosis: f64,
}

impl NumericSummary {
    /// `None` when there are no values.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let sorted = sorted_copy(values);
        let n = sorted.len();
        let (min, max) = (*sorted.first()?, *sorted.last()?);

        let mean = mean_of(&sorted);
        let std = if min == max {
            0.0
        } else {
            let variance = sorted.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n as f64;
            variance.sqrt()
        };

        let (skewness, kurtosis) = if std == 0.0 {
            (0.0, 0.0)
        } else {
            let m3 = sorted.iter().map(|v| ((v - mean) / std).powi(3)).sum::<f64>() / n as f64;
            let m4 = sorted.iter().map(|v| ((v - mean) / std).powi(4)).sum::<f64>() / n as f64;
            (m3, m4 - 3.0)
        };

        let median = median_sorted(&sorted)?;
        let (q1, q3) = quartiles_sorted(&sorted)?;

        Some(Self {
            count: n,
            min,
            max,
            mean,
            median,
            std,
            q1,
            q3,
            iqr: q3 - q1,
            skewness,
            kurtosis,
        })
    }

    pub fn fences(&self, k: f64) -> OutlierBounds {
        OutlierBounds::iqr(self.q1, self.q3, k)
    }

    /// `[mean - t*std, mean + t*std]`, or `None` when `std` is zero.
    pub fn zscore_bounds(&self, t: f64) -> Option<OutlierBounds> {
        (self.std > 0.0).then(|| OutlierBounds {
            lower: self.mean - t * self.std,
            upper: self.mean + t * self.std,
        })
    }
}

/// Ascending copy; the input is left untouched.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Arithmetic mean summed in ascending order; `0` for no values.
pub fn mean_of(sorted: &[f64]) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    sorted.iter().sum::<f64>() / sorted.len() as f64
}

/// Order-independent mean.
pub fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| mean_of(&sorted_copy(values)))
}

/// Median with linear interpolation between the two middle values.
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some(sorted[n / 2 - 1].midpoint(sorted[n / 2])),
    }
}

pub fn median(values: &[f64]) -> Option<f64> {
    median_sorted(&sorted_copy(values))
}

/// Tukey hinges: medians of the lower and upper halves, the middle value
/// belonging to both halves when the count is odd. With fewer than four
/// values the quartiles are the extremes.
pub fn quartiles_sorted(sorted: &[f64]) -> Option<(f64, f64)> {
    let n = sorted.len();
    if n == 0 {
        return None;
    }
    if n < 4 {
        return Some((sorted[0], sorted[n - 1]));
    }
    let half = n.div_ceil(2);
    let q1 = median_sorted(&sorted[..half])?;
    let q3 = median_sorted(&sorted[n - half..])?;
    Some((q1, q3))
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== median / quartiles ====================

    #[test]
    fn test_median_odd_and_even() {
        assert_eq!(median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&[1.0, 2.0, 3.0, 100.0]), Some(2.5));
        assert_eq!(median(&[]), None);
    }

    #[test]
    fn test_quartiles_even_count() {
        let (q1, q3) = quartiles_sorted(&[1.0, 2.0, 3.0, 100.0]).unwrap();
        assert_eq!(q1, 1.5);
        assert_eq!(q3, 51.5);
    }

    #[test]
    fn test_quartiles_odd_count() {
        let (q1, q3) = quartiles_sorted(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        assert_eq!(q1, 2.0);
        assert_eq!(q3, 4.0);
    }

    #[test]
    fn test_quartiles_small_samples() {
        assert_eq!(quartiles_sorted(&[5.0]), Some((5.0, 5.0)));
        assert_eq!(quartiles_sorted(&[1.0, 9.0, 10.0]), Some((1.0, 10.0)));
    }

    #[test]
    fn test_input_not_mutated() {
        let values = vec![3.0, 1.0, 2.0];
        let _ = NumericSummary::from_values(&values);
        assert_eq!(values, vec![3.0, 1.0, 2.0]);
    }

    // ==================== moments ====================

    #[test]
    fn test_population_std() {
        // Mean 5, squared deviations sum to 32 over 8 values
        let summary = NumericSummary::from_values(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_eq!(summary.mean, 5.0);
        assert_eq!(summary.std, 2.0);
    }

    #[test]
    fn test_constant_values() {
        let summary = NumericSummary::from_values(&[0.1, 0.1, 0.1]).unwrap();
        assert_eq!(summary.std, 0.0);
        assert_eq!(summary.skewness, 0.0);
        assert_eq!(summary.kurtosis, 0.0);
        assert!(summary.zscore_bounds(3.0).is_none());
    }

    #[test]
    fn test_skewness_sign() {
        let symmetric = NumericSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert!(symmetric.skewness.abs() < 1e-12);

        let right = NumericSummary::from_values(&[1.0, 1.0, 1.0, 1.0, 10.0]).unwrap();
        assert!(right.skewness > 1.0);
    }

    #[test]
    fn test_excess_kurtosis_of_two_points() {
        // Two-point symmetric distribution has kurtosis 1, excess -2
        let summary = NumericSummary::from_values(&[-1.0, 1.0]).unwrap();
        assert!((summary.kurtosis + 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_values() {
        assert!(NumericSummary::from_values(&[]).is_none());
        assert!(mean(&[]).is_none());
    }

    // ==================== outliers ====================

    #[test]
    fn test_fences_exclude_boundary() {
        let summary = NumericSummary::from_values(&[1.0, 2.0, 3.0, 4.0, 100.0]).unwrap();
        let bounds = summary.fences(1.5);
        assert_eq!(bounds.lower, -1.0);
        assert_eq!(bounds.upper, 7.0);
        assert!(bounds.contains(7.0));
        assert_eq!(bounds.count_outside(&[1.0, 2.0, 3.0, 4.0, 100.0]), 1);
        assert_eq!(bounds.clamp(100.0), 7.0);
        assert_eq!(bounds.clamp(-5.0), -1.0);
        assert_eq!(bounds.clamp(3.0), 3.0);
    }

    #[test]
    fn test_mean_independent_of_order() {
        let a = [0.1, 0.7, 1e16, -1e16, 3.3];
        let b = [3.3, -1e16, 0.7, 1e16, 0.1];
        assert_eq!(mean(&a), mean(&b));
    }
}
