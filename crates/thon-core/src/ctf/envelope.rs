use std::fmt;

use serde::{Deserialize, Serialize};

use super::sig4;

/// Envelope curve families.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvelopeFamily {
    Gaussian,
    GaussianWithConstant,
    DoubleGaussian,
    #[default]
    DoubleGaussianWithConstant,
}

impl EnvelopeFamily {
    pub fn has_constant(&self) -> bool {
        matches!(self, Self::GaussianWithConstant | Self::DoubleGaussianWithConstant)
    }

    pub fn is_double(&self) -> bool {
        matches!(self, Self::DoubleGaussian | Self::DoubleGaussianWithConstant)
    }
}

impl fmt::Display for EnvelopeFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian => write!(f, "gaussian"),
            Self::GaussianWithConstant => write!(f, "gaussian + constant"),
            Self::DoubleGaussian => write!(f, "double gaussian"),
            Self::DoubleGaussianWithConstant => write!(f, "double gaussian + constant"),
        }
    }
}

/// Amplitude decay of the oscillating CTF term, as a function of spatial
/// frequency `s` (1/A).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", content = "coefficients", rename_all = "snake_case")]
pub enum Envelope {
    /// `a*exp(b*s^2)`
    Gaussian([f64; 2]),
    /// `a + b*exp(c*s^2)`
    GaussianWithConstant([f64; 3]),
    /// `a*exp(b*s^2) + c*exp(d*s^2)`
    DoubleGaussian([f64; 4]),
    /// `a + b*exp(c*s^2) + d*exp(e*s^2)`
    DoubleGaussianWithConstant([f64; 5]),
}

impl Default for Envelope {
    fn default() -> Self {
        Self::DoubleGaussianWithConstant([0.0, 1.0, -10.0, 0.0, -100.0])
    }
}

impl Envelope {
    /// Build an envelope of `family` from the five coefficients of the most
    /// general form `a + b*exp(c*s^2) + d*exp(e*s^2)`. Families without a
    /// constant drop `a`, single Gaussians drop `d` and `e`.
    pub fn from_general(family: EnvelopeFamily, c: [f64; 5]) -> Self {
        match family {
            EnvelopeFamily::Gaussian => Self::Gaussian([c[1], c[2]]),
            EnvelopeFamily::GaussianWithConstant => Self::GaussianWithConstant([c[0], c[1], c[2]]),
            EnvelopeFamily::DoubleGaussian => Self::DoubleGaussian([c[1], c[2], c[3], c[4]]),
            EnvelopeFamily::DoubleGaussianWithConstant => Self::DoubleGaussianWithConstant(c),
        }
    }

    /// Coefficients expanded into the general five-term form.
    pub fn to_general(&self) -> [f64; 5] {
        match *self {
            Self::Gaussian([a, b]) => [0.0, a, b, 0.0, 0.0],
            Self::GaussianWithConstant([a, b, c]) => [a, b, c, 0.0, 0.0],
            Self::DoubleGaussian([a, b, c, d]) => [0.0, a, b, c, d],
            Self::DoubleGaussianWithConstant(c) => c,
        }
    }

    pub fn family(&self) -> EnvelopeFamily {
        match self {
            Self::Gaussian(_) => EnvelopeFamily::Gaussian,
            Self::GaussianWithConstant(_) => EnvelopeFamily::GaussianWithConstant,
            Self::DoubleGaussian(_) => EnvelopeFamily::DoubleGaussian,
            Self::DoubleGaussianWithConstant(_) => EnvelopeFamily::DoubleGaussianWithConstant,
        }
    }

    /// Envelope at spatial frequency `s`. Never negative; non-finite values
    /// collapse to zero.
    pub fn evaluate(&self, s: f64) -> f64 {
        let s2 = s * s;
        let [a, b, c, d, e] = self.to_general();
        let v = a + b * (c * s2).exp() + d * (e * s2).exp();
        if !v.is_finite() {
            tracing::debug!(s, "Non-finite envelope value");
            return 0.0;
        }
        v.max(0.0)
    }

    /// Envelope sampled at `n` frequencies `i * step`.
    pub fn curve_values(&self, n: usize, step: f64) -> Vec<f64> {
        (0..n).map(|i| self.evaluate(i as f64 * step)).collect()
    }
}

impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gaussian(c) => write!(f, "{}*exp({}*s^2)", sig4(c[0]), sig4(c[1])),
            Self::GaussianWithConstant(c) => write!(
                f,
                "{} + {}*exp({}*s^2)",
                sig4(c[0]),
                sig4(c[1]),
                sig4(c[2])
            ),
            Self::DoubleGaussian(c) => write!(
                f,
                "{}*exp({}*s^2) + {}*exp({}*s^2)",
                sig4(c[0]),
                sig4(c[1]),
                sig4(c[2]),
                sig4(c[3])
            ),
            Self::DoubleGaussianWithConstant(c) => write!(
                f,
                "{} + {}*exp({}*s^2) + {}*exp({}*s^2)",
                sig4(c[0]),
                sig4(c[1]),
                sig4(c[2]),
                sig4(c[3]),
                sig4(c[4])
            ),
        }
    }
}
