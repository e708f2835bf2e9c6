use std::fmt;

use serde::{Deserialize, Serialize};

use super::sig4;

/// Baseline curve families.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineFamily {
    #[default]
    Polynomial,
    DoubleGaussian,
    Eman,
}

impl fmt::Display for BaselineFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polynomial => write!(f, "polynomial"),
            Self::DoubleGaussian => write!(f, "double gaussian"),
            Self::Eman => write!(f, "EMAN"),
        }
    }
}

/// Smooth background curve of a radial power spectrum profile, as a function
/// of spatial frequency `s` (1/A).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "coefficients", rename_all = "snake_case")]
pub enum BaselineCurve {
    /// `a + b*s + c*s^2 + d*s^3 + e*s^4`
    Polynomial([f64; 5]),
    /// `a + b*exp(c*s^2) + d*exp(e*s^2)`
    DoubleGaussian([f64; 5]),
    /// `a + b*exp(c*sqrt(s) + d*s^2)`
    Eman([f64; 4]),
}

impl BaselineCurve {
    /// A flat unit baseline of the given family.
    pub fn flat(family: BaselineFamily) -> Self {
        match family {
            BaselineFamily::Polynomial => Self::Polynomial([1.0, 0.0, 0.0, 0.0, 0.0]),
            BaselineFamily::DoubleGaussian => {
                Self::DoubleGaussian([1.0, 0.0, -10.0, 0.0, -100.0])
            }
            BaselineFamily::Eman => Self::Eman([1.0, 0.0, 0.0, 0.0]),
        }
    }

    pub fn family(&self) -> BaselineFamily {
        match self {
            Self::Polynomial(_) => BaselineFamily::Polynomial,
            Self::DoubleGaussian(_) => BaselineFamily::DoubleGaussian,
            Self::Eman(_) => BaselineFamily::Eman,
        }
    }

    pub fn coefficients(&self) -> &[f64] {
        match self {
            Self::Polynomial(c) | Self::DoubleGaussian(c) => c.as_slice(),
            Self::Eman(c) => c.as_slice(),
        }
    }

    /// Raw curve value, without clamping.
    pub fn evaluate(&self, s: f64) -> f64 {
        let s2 = s * s;
        match self {
            Self::Polynomial(c) => c[0] + s * (c[1] + s * (c[2] + s * (c[3] + s * c[4]))),
            Self::DoubleGaussian(c) => c[0] + c[1] * (c[2] * s2).exp() + c[3] * (c[4] * s2).exp(),
            Self::Eman(c) => c[0] + c[1] * (c[2] * s.sqrt() + c[3] * s2).exp(),
        }
    }
}

impl fmt::Display for BaselineCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Polynomial(c) => write!(
                f,
                "{} + {}*s + {}*s^2 + {}*s^3 + {}*s^4",
                sig4(c[0]),
                sig4(c[1]),
                sig4(c[2]),
                sig4(c[3]),
                sig4(c[4])
            ),
            Self::DoubleGaussian(c) => write!(
                f,
                "{} + {}*exp({}*s^2) + {}*exp({}*s^2)",
                sig4(c[0]),
                sig4(c[1]),
                sig4(c[2]),
                sig4(c[3]),
                sig4(c[4])
            ),
            Self::Eman(c) => write!(
                f,
                "{} + {}*exp({}*sqrt(s) + {}*s^2)",
                sig4(c[0]),
                sig4(c[1]),
                sig4(c[2]),
                sig4(c[3])
            ),
        }
    }
}

/// Gaussian bump `amplitude*exp(sharpness*(s - location)^2)` modelling the
/// water ring on top of the baseline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bump {
    pub amplitude: f64,
    pub location: f64,
    /// Negative for a peak.
    pub sharpness: f64,
}

impl Bump {
    pub fn evaluate(&self, s: f64) -> f64 {
        let d = s - self.location;
        self.amplitude * (self.sharpness * d * d).exp()
    }
}

/// Background model: a curve plus an optional water ring bump.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub curve: BaselineCurve,
    #[serde(default)]
    pub bump: Option<Bump>,
}

impl Default for Baseline {
    fn default() -> Self {
        Self::new(BaselineCurve::flat(BaselineFamily::Polynomial))
    }
}

impl Baseline {
    pub fn new(curve: BaselineCurve) -> Self {
        Self { curve, bump: None }
    }

    pub fn with_bump(mut self, bump: Option<Bump>) -> Self {
        self.bump = bump;
        self
    }

    pub fn family(&self) -> BaselineFamily {
        self.curve.family()
    }

    /// Baseline at spatial frequency `s`. Never negative; non-finite values
    /// collapse to zero.
    pub fn evaluate(&self, s: f64) -> f64 {
        let b = self.curve.evaluate(s) + self.bump.map_or(0.0, |bump| bump.evaluate(s));
        if !b.is_finite() {
            tracing::debug!(s, "Non-finite baseline value");
            return 0.0;
        }
        b.max(0.0)
    }

    /// Baseline sampled at `n` frequencies `i * step`.
    pub fn curve_values(&self, n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| self.evaluate(i as f64 * step)).collect()
    }
}

impl fmt::Display for Baseline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.curve)?;
        if let Some(bump) = self.bump {
            write!(
                f,
                " + {}*exp({}*(s-{})^2)",
                sig4(bump.amplitude),
                sig4(bump.sharpness),
                sig4(bump.location)
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_evaluation() {
        let curve = BaselineCurve::Polynomial([1.0, 2.0, 3.0, 4.0, 5.0]);
        let s: f64 = 0.5;
        let expected = 1.0 + 2.0 * s + 3.0 * s * s + 4.0 * s.powi(3) + 5.0 * s.powi(4);
        assert!((curve.evaluate(s) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_baseline_clamped_at_zero() {
        let baseline = Baseline::new(BaselineCurve::Polynomial([-1.0, 0.0, 0.0, 0.0, 0.0]));
        assert_eq!(baseline.evaluate(0.1), 0.0);
    }

    #[test]
    fn test_bump_adds_peak() {
        let baseline = Baseline::default().with_bump(Some(Bump {
            amplitude: 0.5,
            location: 0.265,
            sharpness: -2000.0,
        }));
        assert!((baseline.evaluate(0.265) - 1.5).abs() < 1e-12);
        assert!(baseline.evaluate(0.1) < 1.01);
    }
}
