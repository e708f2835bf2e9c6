use tracing::debug;

use super::polynomial::fit_polynomial;

/// Centered moving average. The window is truncated at the ends.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = window / 2;
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            values[lo..hi].iter().sum::<f64>() / (hi - lo) as f64
        })
        .collect()
}

/// Centered moving polynomial: every point is replaced by the value at its
/// position of a local least squares polynomial over the surrounding window.
/// At the ends only the available points are fitted.
pub fn moving_polynomial(order: usize, values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    let half = (window / 2).max(1);
    (0..n)
        .map(|i| {
            let lo = i.saturating_sub(half);
            let hi = (i + half + 1).min(n);
            let x: Vec<f64> = (lo..hi)
                .map(|j| (j as f64 - i as f64) / half as f64)
                .collect();
            match fit_polynomial(&x, &values[lo..hi], order) {
                Ok(fit) => fit.coefficients[0],
                Err(e) => {
                    debug!(index = i, error = %e, "Local polynomial fit failed");
                    values[i]
                }
            }
        })
        .collect()
}
