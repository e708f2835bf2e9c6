use nalgebra::{DMatrix, DVector};

use crate::error::{CtfError, Result};

/// Least squares polynomial `c[0] + c[1]*x + ... + c[k]*x^k`.
#[derive(Clone, Debug, PartialEq)]
pub struct PolynomialFit {
    pub coefficients: Vec<f64>,
    /// Root mean square deviation of the fit from the samples.
    pub residual: f64,
}

impl PolynomialFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }
}

/// Fit a polynomial of the given order to `(x, y)` samples.
///
/// The order is reduced when there are too few samples to determine all
/// coefficients; the dropped high-order coefficients are returned as zero.
/// The abscissa is scaled to unit magnitude before solving to keep the
/// Vandermonde matrix well conditioned.
pub fn fit_polynomial(x: &[f64], y: &[f64], order: usize) -> Result<PolynomialFit> {
    let n = x.len().min(y.len());
    if n == 0 {
        return Err(CtfError::Fit("no samples for polynomial fit".into()));
    }
    let terms = (order + 1).min(n);

    let scale = x[..n].iter().fold(0.0_f64, |m, v| m.max(v.abs()));
    let scale = if scale > 0.0 { scale } else { 1.0 };

    let design = DMatrix::from_fn(n, terms, |i, k| (x[i] / scale).powi(k as i32));
    let rhs = DVector::from_row_slice(&y[..n]);
    let beta = solve_least_squares(&design, &rhs)
        .ok_or_else(|| CtfError::Fit("ill-conditioned polynomial fit".into()))?;

    let mut coefficients = vec![0.0; order + 1];
    for (k, b) in beta.iter().enumerate() {
        coefficients[k] = b / scale.powi(k as i32);
    }

    let mut fit = PolynomialFit {
        coefficients,
        residual: 0.0,
    };
    let ss: f64 = x[..n]
        .iter()
        .zip(&y[..n])
        .map(|(&xi, &yi)| (fit.evaluate(xi) - yi).powi(2))
        .sum();
    fit.residual = (ss / n as f64).sqrt();
    Ok(fit)
}

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }
    None
}
